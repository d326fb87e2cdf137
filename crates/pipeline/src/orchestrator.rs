//! End-to-end migration of one movement into the legacy store.
//!
//! Steps, each short-circuiting on failure:
//!
//! 1. movement and its two-letter code;
//! 2. organizational assignment (the first one when several exist);
//! 3. draft mapping, date formatting, percentage and base/confidence
//!    validation, before anything touches the legacy store;
//! 4. period code from the latest applied affectation;
//! 5. legacy identity, read-through: relational store, then legacy
//!    lookup by CURP/RFC, then "create affiliate" (persisting the result);
//! 6. "edit entity" with the completed payload, and interpretation of
//!    its result code.

use std::sync::Arc;

use nomina_core::movement::{classify_edit_result, EditResultClass, MovementCode};
use nomina_core::types::{DbId, Interno};
use nomina_db::models::assignment::OrgAssignment;
use nomina_db::models::movement::Movement;
use nomina_legacy::invoker::EditEntityOutcome;
use nomina_legacy::statement::render_literal;
use nomina_legacy::ProcedureInvoker;
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::MigrationError;
use crate::mapper::{diagnose_identity, map_affiliate_for_create, map_movement, SiteConstants};
use crate::period::PeriodResolver;
use crate::result::{MigrationContext, MigrationOutcome, MigrationResult, MigrationStep};
use crate::store::PersonnelStore;

/// Where a resolved legacy identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Already stored on the affiliate.
    Relational,
    /// Found in the legacy store by CURP or RFC.
    LegacyLookup,
    /// Generated by "create affiliate".
    Created,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentityResolution {
    pub interno: Interno,
    pub source: IdentitySource,
    pub retry_count: u32,
}

/// Migrates movements from the relational store into the legacy store.
pub struct MigrationOrchestrator {
    store: Arc<dyn PersonnelStore>,
    invoker: ProcedureInvoker,
    periods: PeriodResolver,
    site: SiteConstants,
}

impl MigrationOrchestrator {
    pub fn new(store: Arc<dyn PersonnelStore>, invoker: ProcedureInvoker, site: SiteConstants) -> Self {
        let periods = PeriodResolver::new(Arc::clone(&store));
        Self {
            store,
            invoker,
            periods,
            site,
        }
    }

    pub fn invoker(&self) -> &ProcedureInvoker {
        &self.invoker
    }

    pub(crate) fn store(&self) -> &Arc<dyn PersonnelStore> {
        &self.store
    }

    pub(crate) fn periods(&self) -> &PeriodResolver {
        &self.periods
    }

    pub(crate) fn site(&self) -> &SiteConstants {
        &self.site
    }

    // -----------------------------------------------------------------------
    // Entry point
    // -----------------------------------------------------------------------

    /// Migrate one movement. Never fails: every failure is reported in the
    /// returned [`MigrationResult`] with its context.
    pub async fn migrate_movement(&self, movement_id: DbId) -> MigrationResult {
        let started = Instant::now();
        let migration_id = Uuid::now_v7();
        let mut ctx = MigrationContext::new(movement_id);
        let mut retry_count = 0u32;

        tracing::debug!(%migration_id, movement_id, "Starting movement migration");

        match self.run(&mut ctx, &mut retry_count).await {
            Ok(edit) => self.interpret(migration_id, ctx, edit, retry_count, started),
            Err(e) => self.failure(migration_id, ctx, e, retry_count, started),
        }
    }

    async fn run(
        &self,
        ctx: &mut MigrationContext,
        retry_count: &mut u32,
    ) -> Result<EditEntityOutcome, MigrationError> {
        ctx.failed_step = MigrationStep::ResolveMovementCode;
        let (movement, code) = self.load_movement(ctx.movement_id).await?;
        ctx.affiliate_id = Some(movement.affiliate_id);

        ctx.failed_step = MigrationStep::ResolveAssignment;
        let assignment = self.load_assignment(movement.affiliate_id).await?;

        ctx.failed_step = MigrationStep::ValidatePayload;
        let draft = map_movement(&movement, code, &assignment);
        ctx.org_codes = draft.org_codes();
        draft.validate()?;

        ctx.failed_step = MigrationStep::ResolvePeriod;
        let period = self.periods.require(&draft.org0, &draft.org1).await?;
        ctx.period = Some(period.clone());

        ctx.failed_step = MigrationStep::ResolveIdentity;
        let identity = self.resolve_identity(movement.affiliate_id).await?;
        *retry_count += identity.retry_count;
        ctx.interno = Some(identity.interno);

        ctx.failed_step = MigrationStep::ValidatePayload;
        let payload = draft.into_payload(identity.interno, &period)?;
        let args = payload.to_arguments();
        ctx.statement = Some(render_literal(&self.invoker.names().edit_entity, &args));
        ctx.payload = Some(payload);

        ctx.failed_step = MigrationStep::InvokeEdit;
        let edit = self.invoker.edit_entity(args).await?;
        *retry_count += edit.retry_count;
        Ok(edit)
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    pub(crate) async fn load_movement(
        &self,
        movement_id: DbId,
    ) -> Result<(Movement, MovementCode), MigrationError> {
        let movement = self
            .store
            .find_movement(movement_id)
            .await?
            .ok_or(MigrationError::MovementNotFound(movement_id))?;
        let movement_type = self
            .store
            .find_movement_type(movement.movement_type_id)
            .await?
            .ok_or(MigrationError::MovementTypeNotFound(movement.movement_type_id))?;
        let code = MovementCode::from_code(&movement_type.code)
            .ok_or_else(|| MigrationError::UnknownMovementCode(movement_type.code.clone()))?;
        Ok((movement, code))
    }

    pub(crate) async fn load_assignment(
        &self,
        affiliate_id: DbId,
    ) -> Result<OrgAssignment, MigrationError> {
        self.store
            .first_assignment(affiliate_id)
            .await?
            .ok_or(MigrationError::AssignmentNotFound(affiliate_id))
    }

    /// Resolve the legacy identity of an affiliate, creating the legacy
    /// record when neither store knows it yet.
    pub async fn resolve_identity(
        &self,
        affiliate_id: DbId,
    ) -> Result<IdentityResolution, MigrationError> {
        let affiliate = self
            .store
            .find_affiliate(affiliate_id)
            .await?
            .ok_or(MigrationError::AffiliateNotFound(affiliate_id))?;
        if let Some(interno) = affiliate.legacy_identity() {
            return Ok(IdentityResolution {
                interno,
                source: IdentitySource::Relational,
                retry_count: 0,
            });
        }

        let gateway = self.invoker.gateway();
        gateway.connect().await?;

        let found = gateway
            .lookup_interno(affiliate.curp.as_deref(), affiliate.rfc.as_deref())
            .await?;
        if let Some(interno) = found {
            let interno = self.persist_identity(affiliate_id, interno).await?;
            tracing::info!(affiliate_id, interno, "Legacy identity found by CURP/RFC");
            return Ok(IdentityResolution {
                interno,
                source: IdentitySource::LegacyLookup,
                retry_count: 0,
            });
        }

        let args = map_affiliate_for_create(&affiliate, &self.site, gateway.corrector())?;
        let created = self.invoker.create_affiliate(args).await?;
        if created.interno <= 0 {
            let mut problems = diagnose_identity(&affiliate);
            if problems.is_empty() {
                problems.push("Legacy store returned no identity for input that passes local checks".to_string());
            }
            tracing::warn!(affiliate_id, ?problems, "Legacy store rejected affiliate creation");
            return Err(MigrationError::IdentityRejected {
                affiliate_id,
                problems,
            });
        }

        let interno = self.persist_identity(affiliate_id, created.interno).await?;
        tracing::info!(
            affiliate_id,
            interno,
            retry_count = created.retry_count,
            elapsed_ms = created.elapsed_ms,
            "Legacy affiliate created",
        );
        Ok(IdentityResolution {
            interno,
            source: IdentitySource::Created,
            retry_count: created.retry_count,
        })
    }

    /// Write the identity back; an identity stored concurrently wins.
    async fn persist_identity(
        &self,
        affiliate_id: DbId,
        interno: Interno,
    ) -> Result<Interno, MigrationError> {
        let row = self
            .store
            .set_interno(affiliate_id, interno)
            .await?
            .ok_or(MigrationError::AffiliateNotFound(affiliate_id))?;
        Ok(row.legacy_identity().unwrap_or(interno))
    }

    // -----------------------------------------------------------------------
    // Results
    // -----------------------------------------------------------------------

    fn interpret(
        &self,
        migration_id: Uuid,
        mut ctx: MigrationContext,
        edit: EditEntityOutcome,
        retry_count: u32,
        started: Instant,
    ) -> MigrationResult {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let movement_id = ctx.movement_id;
        let class = classify_edit_result(edit.error_code, edit.error_message.as_deref());

        let (outcome, legacy_error_code, context) = match class {
            EditResultClass::Applied => {
                tracing::info!(%migration_id, movement_id, retry_count, elapsed_ms, "Movement applied to legacy store");
                (MigrationOutcome::Applied, 0, None)
            }
            EditResultClass::AlreadyActive => {
                tracing::info!(
                    %migration_id,
                    movement_id,
                    legacy_code = edit.error_code,
                    legacy_message = ?edit.error_message,
                    "Movement already active in legacy store, counted as applied",
                );
                (MigrationOutcome::AlreadyActive, 0, None)
            }
            EditResultClass::Rejected => {
                ctx.failed_step = MigrationStep::InterpretResult;
                ctx.detail = edit
                    .error_message
                    .clone()
                    .unwrap_or_else(|| format!("Legacy error code {}", edit.error_code));
                tracing::warn!(
                    %migration_id,
                    movement_id,
                    legacy_code = edit.error_code,
                    detail = %ctx.detail,
                    statement = ?ctx.statement,
                    "Legacy store rejected movement",
                );
                (MigrationOutcome::BusinessRejection, edit.error_code, Some(ctx))
            }
        };

        MigrationResult {
            migration_id,
            movement_id,
            success: outcome.is_success(),
            outcome,
            legacy_error_code: Some(legacy_error_code),
            legacy_error_message: edit.error_message,
            retry_count,
            elapsed_ms,
            context,
        }
    }

    fn failure(
        &self,
        migration_id: Uuid,
        mut ctx: MigrationContext,
        error: MigrationError,
        retry_count: u32,
        started: Instant,
    ) -> MigrationResult {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let outcome = error.outcome();
        let retry_count = retry_count + error.retries_consumed();
        ctx.detail = error.to_string();

        if outcome == MigrationOutcome::ValidationFailure {
            tracing::warn!(
                %migration_id,
                movement_id = ctx.movement_id,
                step = %ctx.failed_step,
                error = %error,
                "Movement migration failed validation",
            );
        } else {
            tracing::error!(
                %migration_id,
                movement_id = ctx.movement_id,
                affiliate_id = ?ctx.affiliate_id,
                step = %ctx.failed_step,
                outcome = %outcome,
                error = %error,
                "Movement migration failed",
            );
        }

        let legacy_error_message = match &error {
            MigrationError::Legacy(_) | MigrationError::IdentityRejected { .. } => {
                Some(error.to_string())
            }
            _ => None,
        };

        MigrationResult {
            migration_id,
            movement_id: ctx.movement_id,
            success: false,
            outcome,
            legacy_error_code: error.legacy_code(),
            legacy_error_message,
            retry_count,
            elapsed_ms,
            context: Some(ctx),
        }
    }
}
