//! Dry-run previews: the exact legacy calls a migration would make,
//! built from the relational store alone.

use nomina_core::movement::MovementCode;
use nomina_core::types::{DbId, Interno};
use nomina_legacy::statement::render_literal;
use nomina_legacy::LegacyValue;
use serde::Serialize;

use crate::error::MigrationError;
use crate::mapper::{diagnose_identity, map_affiliate_for_create, map_movement, LegacyMovementPayload};
use crate::orchestrator::MigrationOrchestrator;

/// What resolving an affiliate's legacy identity would do.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityPreview {
    pub affiliate_id: DbId,
    /// Identity already stored on the affiliate, if any.
    pub existing_interno: Option<Interno>,
    /// "Create affiliate" arguments, in procedure order.
    pub arguments: Vec<LegacyValue>,
    pub statement: String,
    /// Inputs the legacy store is likely to refuse.
    pub warnings: Vec<String>,
}

/// What migrating a movement would send to "edit entity".
#[derive(Debug, Clone, Serialize)]
pub struct MovementPreview {
    pub movement_id: DbId,
    pub affiliate_id: DbId,
    pub movement_code: MovementCode,
    pub period: String,
    /// `None` when the affiliate has no legacy identity yet; migrating
    /// would resolve or create it first.
    pub interno: Option<Interno>,
    pub payload: Option<LegacyMovementPayload>,
    pub arguments: Vec<LegacyValue>,
    pub statement: Option<String>,
}

impl MigrationOrchestrator {
    /// Preview the "create affiliate" call for an affiliate without
    /// touching the legacy store.
    pub async fn preview_identity(&self, affiliate_id: DbId) -> Result<IdentityPreview, MigrationError> {
        let affiliate = self
            .store()
            .find_affiliate(affiliate_id)
            .await?
            .ok_or(MigrationError::AffiliateNotFound(affiliate_id))?;

        let corrector = self.invoker().gateway().corrector();
        let arguments = map_affiliate_for_create(&affiliate, self.site(), corrector)?;
        let statement = render_literal(&self.invoker().names().create_affiliate, &arguments);

        Ok(IdentityPreview {
            affiliate_id,
            existing_interno: affiliate.legacy_identity(),
            arguments,
            statement,
            warnings: diagnose_identity(&affiliate),
        })
    }

    /// Preview the "edit entity" call for a movement. Validation runs as in
    /// a real migration; a missing identity is reported, not created.
    pub async fn preview_movement(&self, movement_id: DbId) -> Result<MovementPreview, MigrationError> {
        let (movement, code) = self.load_movement(movement_id).await?;
        let assignment = self.load_assignment(movement.affiliate_id).await?;
        let draft = map_movement(&movement, code, &assignment);
        draft.validate()?;

        let period = self.periods().require(&draft.org0, &draft.org1).await?;
        let interno = self
            .store()
            .find_affiliate(movement.affiliate_id)
            .await?
            .ok_or(MigrationError::AffiliateNotFound(movement.affiliate_id))?
            .legacy_identity();

        let (payload, arguments, statement) = match interno {
            Some(interno) => {
                let payload = draft.into_payload(interno, &period)?;
                let arguments = payload.to_arguments();
                let statement = render_literal(&self.invoker().names().edit_entity, &arguments);
                (Some(payload), arguments, Some(statement))
            }
            None => {
                tracing::debug!(movement_id, affiliate_id = movement.affiliate_id, "Preview without legacy identity");
                (None, Vec::new(), None)
            }
        };

        Ok(MovementPreview {
            movement_id,
            affiliate_id: movement.affiliate_id,
            movement_code: code,
            period,
            interno,
            payload,
            arguments,
            statement,
        })
    }
}
