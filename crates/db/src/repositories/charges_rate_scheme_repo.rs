//! Repository for the `charges_rate_schemes` table.

use coop_core::tenant::UserContext;
use coop_core::types::DbId;
use coop_core::validation::validate_request;

use crate::error::DbError;
use crate::models::charges_rate_scheme::{
    ChargesRateScheme, ChargesRateSchemeRequest, ChargesRateSchemeResponse,
};
use crate::record::Record;
use crate::registry::{EntityRequest, Registry, RegistryParams};
use crate::repositories::charges_rate_by_range_or_minimum_amount_repo::charges_rate_by_range_or_minimum_amount_registry;
use crate::repositories::sync_children;
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type ChargesRateSchemeRepo<S = PgStore> =
    Registry<ChargesRateScheme, ChargesRateSchemeResponse, ChargesRateSchemeRequest, S>;

pub fn charges_rate_scheme_registry<S: Store>(store: S) -> ChargesRateSchemeRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(
            vec!["charges_rate_by_range_or_minimum_amounts"],
            |scheme: &ChargesRateScheme| ChargesRateSchemeResponse::from(scheme),
        ),
    )
}

impl<S: Store> Registry<ChargesRateScheme, ChargesRateSchemeResponse, ChargesRateSchemeRequest, S> {
    /// Create or update a scheme together with its brackets in one
    /// transaction.
    pub async fn save(
        &self,
        user: &UserContext,
        id: Option<DbId>,
        request: &ChargesRateSchemeRequest,
    ) -> Result<ChargesRateScheme, DbError> {
        validate_request(request)?;
        let ranges = charges_rate_by_range_or_minimum_amount_registry(self.store().clone());

        let (mut scheme, existing) = match id {
            Some(id) => {
                let mut scheme = self.get_for_user(user, id).await?;
                scheme.check_brackets_after(request)?;
                let existing = scheme
                    .charges_rate_by_range_or_minimum_amounts
                    .iter()
                    .map(Record::id)
                    .collect::<Vec<_>>();
                request.apply_to(&mut scheme);
                (scheme, existing)
            }
            None => (request.to_entity(user), Vec::new()),
        };
        scheme.clear_relations();

        let mut tx = self.store().begin().await?;
        let saved = match id {
            Some(_) => self.update_with_tx(&mut tx, user.user_id, scheme).await?,
            None => self.create_with_tx(&mut tx, user.user_id, scheme).await?,
        };
        let children = request
            .charges_rate_by_range_or_minimum_amounts
            .iter()
            .map(|range_request| {
                let mut range = range_request.to_entity(user);
                range.charges_rate_scheme_id = saved.id();
                range
            })
            .collect();
        sync_children(
            &ranges,
            &mut tx,
            user.user_id,
            &existing,
            children,
            &request.charges_rate_by_range_or_minimum_amounts_deleted,
        )
        .await?;
        self.store().commit(tx).await?;

        tracing::info!(
            charges_rate_scheme_id = %saved.id(),
            ranges = request.charges_rate_by_range_or_minimum_amounts.len(),
            "Charges rate scheme saved"
        );
        self.get_by_id(saved.id()).await
    }
}
