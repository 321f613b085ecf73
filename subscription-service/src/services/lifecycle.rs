//! Subscription lifecycle engine.
//!
//! Drives the subscription state machine against the billing gateway and
//! the subscription store: create, cancel (immediate or at renewal), modify
//! (immediate or deferred), and the explicit activation of a deferred
//! successor once its renewal arrives.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use crate::error::SubscriptionError;
use crate::gateway::BillingGateway;
use crate::models::{
    PlanChange, ProfileDetails, Subscription, SubscriptionDraft, SubscriptionState, Timeframe,
};
use crate::repository::SubscriptionStore;
use crate::services::hooks::{PlanCatalog, SubscriptionHooks};

/// The lifecycle engine.
///
/// Sequencing rule for every operation: remote effects go out first, local
/// state is persisted second, and entitlement hooks fire in between once the
/// remote financial state has irrevocably changed. A gateway failure
/// therefore never leaves a half-applied local record, while a storage
/// failure after a successful gateway call surfaces as a
/// [`SubscriptionError::ConsistencyAlarm`] rather than a silent rollback.
pub struct SubscriptionLifecycle<G, S, C, H> {
    gateway: G,
    store: S,
    catalog: C,
    hooks: H,
}

impl<G, S, C, H> SubscriptionLifecycle<G, S, C, H>
where
    G: BillingGateway,
    S: SubscriptionStore,
    C: PlanCatalog,
    H: SubscriptionHooks,
{
    pub fn new(gateway: G, store: S, catalog: C, hooks: H) -> Self {
        Self {
            gateway,
            store,
            catalog,
            hooks,
        }
    }

    /// Obtain the payer-facing authorization URL that yields the one-time
    /// token consumed by [`create`](Self::create).
    pub async fn authorization_url(
        &self,
        description: &str,
        return_url: &str,
        cancel_url: &str,
    ) -> Result<String, SubscriptionError> {
        Ok(self
            .gateway
            .setup_agreement(description, return_url, cancel_url)
            .await?)
    }

    /// Create a subscription from a draft.
    ///
    /// An `Active` draft gets its remote billing profile before anything is
    /// persisted; when the gateway declines, nothing is stored and the
    /// gateway's message is surfaced. A `Pending` draft is persisted without
    /// touching the gateway: a deferred successor has no profile until
    /// [`activate_pending`](Self::activate_pending) runs.
    #[instrument(skip(self, draft), fields(plan_code = %draft.plan.plan_code, state = %draft.state))]
    pub async fn create(
        &self,
        draft: SubscriptionDraft,
    ) -> Result<Subscription, SubscriptionError> {
        match draft.state {
            SubscriptionState::Active => self.create_active(draft).await,
            SubscriptionState::Pending => self.create_pending(draft).await,
            state => Err(SubscriptionError::InvalidTransition {
                from: state,
                operation: "create",
            }),
        }
    }

    /// Cancel a subscription, immediately or at the next renewal.
    ///
    /// Already `Cancelled` or `Inactive` records are a successful no-op with
    /// no gateway call. A `Changed` record delegates to its successor (its
    /// own profile was cancelled when it entered `Changed`). A `Pending`
    /// record is always cancelled immediately: nothing has started, so there
    /// is no renewal to wait for.
    #[instrument(
        skip(self, subscription),
        fields(
            subscription_id = %subscription.subscription_id,
            state = %subscription.state,
            timeframe = ?timeframe,
        )
    )]
    pub async fn cancel(
        &self,
        subscription: &mut Subscription,
        timeframe: Timeframe,
    ) -> Result<(), SubscriptionError> {
        match subscription.state {
            SubscriptionState::Cancelled | SubscriptionState::Inactive => {
                info!("Cancel is a no-op in this state");
                Ok(())
            }
            SubscriptionState::Changed => self.cancel_successor(subscription).await,
            SubscriptionState::Pending => {
                self.cancel_current(subscription, Timeframe::Now).await
            }
            SubscriptionState::Active => self.cancel_current(subscription, timeframe).await,
        }
    }

    /// Replace a subscription's plan and return the successor record.
    ///
    /// `Timeframe::Now` cancels the current profile, deactivates the record
    /// and creates an `Active` successor billing from now. `Timeframe::Renewal`
    /// parks a `Pending` successor that starts billing on the current
    /// profile's next payment date and moves this record to `Changed`.
    ///
    /// A repeat modify on a `Changed` record supersedes the earlier deferred
    /// change: its never-started successor is cancelled first.
    #[instrument(
        skip(self, subscription, change),
        fields(
            subscription_id = %subscription.subscription_id,
            state = %subscription.state,
            timeframe = ?timeframe,
        )
    )]
    pub async fn modify(
        &self,
        subscription: &mut Subscription,
        change: PlanChange,
        timeframe: Timeframe,
    ) -> Result<Subscription, SubscriptionError> {
        match subscription.state {
            SubscriptionState::Active | SubscriptionState::Changed => {}
            state => {
                return Err(SubscriptionError::InvalidTransition {
                    from: state,
                    operation: "modify",
                })
            }
        }

        if subscription.state == SubscriptionState::Changed {
            self.cancel_successor(subscription).await?;
            subscription.successor_id = None;
        }

        match timeframe {
            Timeframe::Now => self.modify_now(subscription, change).await,
            Timeframe::Renewal => self.modify_on_renewal(subscription, change).await,
        }
    }

    /// Activate a deferred successor once its renewal has actually arrived.
    ///
    /// This is the only `Pending` to `Active` path, and it is driven by an
    /// external scheduler, never by the engine itself. `token` is a fresh
    /// payer authorization for gateways that need one; the token used at the
    /// original signup was consumed by the predecessor's profile.
    #[instrument(
        skip(self, subscription, token),
        fields(subscription_id = %subscription.subscription_id)
    )]
    pub async fn activate_pending(
        &self,
        subscription: &mut Subscription,
        token: Option<&str>,
    ) -> Result<(), SubscriptionError> {
        if subscription.state != SubscriptionState::Pending {
            return Err(SubscriptionError::InvalidTransition {
                from: subscription.state,
                operation: "activate_pending",
            });
        }

        let mut options = self.catalog.profile_options(&subscription.plan)?;
        options.start_date = subscription.start_date.unwrap_or_else(Utc::now);
        options.initial_amount = subscription.initial_amount;

        let profile_id = self.gateway.create_profile(token, &options).await?;

        subscription.profile_id = Some(profile_id.clone());
        subscription.state = SubscriptionState::Active;
        subscription.touch();
        // The profile is already billing; access is granted even if the
        // write below fails.
        self.hooks.on_activate(subscription).await;
        self.persist_update(subscription, "pending activation", true)
            .await?;

        info!(profile_id = %profile_id, "Deferred subscription activated");
        Ok(())
    }

    /// Force a record through immediate cancellation unless it is already
    /// `Inactive`. Must run before a record is permanently removed so the
    /// remote profile is cancelled and the deactivation hook fires.
    #[instrument(
        skip(self, subscription),
        fields(subscription_id = %subscription.subscription_id, state = %subscription.state)
    )]
    pub async fn ensure_deactivated(
        &self,
        subscription: &mut Subscription,
    ) -> Result<(), SubscriptionError> {
        match subscription.state {
            SubscriptionState::Inactive => Ok(()),
            SubscriptionState::Active | SubscriptionState::Pending => {
                self.cancel(subscription, Timeframe::Now).await
            }
            SubscriptionState::Changed => {
                self.cancel_successor(subscription).await?;
                subscription.successor_id = None;
                self.finish_cancel(subscription, Timeframe::Now, None, false)
                    .await
            }
            // The remote profile is already gone; only the local disposition
            // and the hook remain.
            SubscriptionState::Cancelled => {
                self.finish_cancel(subscription, Timeframe::Now, None, false)
                    .await
            }
        }
    }

    /// The gateway's current view of this record's profile.
    pub async fn profile(
        &self,
        subscription: &Subscription,
    ) -> Result<ProfileDetails, SubscriptionError> {
        let profile_id = subscription.profile_id.as_deref().ok_or_else(|| {
            SubscriptionError::Configuration(anyhow!(
                "subscription {} has no billing profile",
                subscription.subscription_id
            ))
        })?;
        Ok(self.gateway.profile_details(profile_id).await?)
    }

    /// The next payment date the gateway reports for this record. `None`
    /// for records without a profile and for cancelled profiles, which stop
    /// reporting one.
    pub async fn next_payment_due(
        &self,
        subscription: &Subscription,
    ) -> Result<Option<DateTime<Utc>>, SubscriptionError> {
        let Some(profile_id) = subscription.profile_id.as_deref() else {
            return Ok(None);
        };
        let details = self.gateway.profile_details(profile_id).await?;
        Ok(details.next_billing_date)
    }

    async fn create_active(
        &self,
        draft: SubscriptionDraft,
    ) -> Result<Subscription, SubscriptionError> {
        let mut options = self.catalog.profile_options(&draft.plan)?;
        options.start_date = draft.start_date.unwrap_or_else(Utc::now);
        options.initial_amount = draft.initial_amount;

        let profile_id = self
            .gateway
            .create_profile(draft.token.as_deref(), &options)
            .await?;

        let mut subscription = Subscription::from_draft(&draft);
        subscription.profile_id = Some(profile_id.clone());

        if let Err(err) = self.store.insert(&subscription).await {
            error!(
                subscription_id = %subscription.subscription_id,
                profile_id = %profile_id,
                error = %err,
                "Profile exists remotely but the record could not be persisted"
            );
            return Err(SubscriptionError::ConsistencyAlarm {
                subscription_id: subscription.subscription_id,
                detail: format!("profile {profile_id} was created but insert failed: {err}"),
            });
        }

        info!(
            subscription_id = %subscription.subscription_id,
            profile_id = %profile_id,
            "Subscription created"
        );
        self.hooks.on_activate(&subscription).await;
        Ok(subscription)
    }

    async fn create_pending(
        &self,
        draft: SubscriptionDraft,
    ) -> Result<Subscription, SubscriptionError> {
        // No gateway call: a deferred successor gets its profile only when
        // the renewal trigger runs activate_pending.
        let subscription = Subscription::from_draft(&draft);
        self.store
            .insert(&subscription)
            .await
            .map_err(SubscriptionError::Storage)?;
        info!(
            subscription_id = %subscription.subscription_id,
            start_date = ?subscription.start_date,
            "Deferred subscription persisted"
        );
        Ok(subscription)
    }

    async fn modify_now(
        &self,
        subscription: &mut Subscription,
        change: PlanChange,
    ) -> Result<Subscription, SubscriptionError> {
        let successor_plan = change.apply(&subscription.plan);

        // Remote first: the old profile must be gone before the replacement
        // starts charging.
        self.cancel_current(subscription, Timeframe::Now).await?;

        let draft = SubscriptionDraft {
            plan: successor_plan,
            token: change.token,
            start_date: Some(Utc::now()),
            initial_amount: change.initial_amount,
            state: SubscriptionState::Active,
        };
        let successor = self.create_active(draft).await?;

        info!(
            successor_id = %successor.subscription_id,
            "Plan replaced immediately"
        );
        Ok(successor)
    }

    async fn modify_on_renewal(
        &self,
        subscription: &mut Subscription,
        change: PlanChange,
    ) -> Result<Subscription, SubscriptionError> {
        // The handoff date: readable from the profile while Active; a
        // Changed record keeps it in modify_on, its profile is already gone.
        let renewal_on = match subscription.state {
            SubscriptionState::Changed => subscription.modify_on,
            _ => self.next_payment_due(subscription).await?,
        };
        let Some(renewal_on) = renewal_on else {
            return Err(SubscriptionError::GatewayDeclined(
                "no next payment date to defer the change to".to_string(),
            ));
        };

        let draft = SubscriptionDraft {
            plan: change.apply(&subscription.plan),
            token: change.token,
            start_date: Some(renewal_on),
            initial_amount: change.initial_amount,
            state: SubscriptionState::Pending,
        };
        let mut successor = self.create_pending(draft).await?;

        // Hand the remainder of the paid period over to the successor.
        if let Err(err) = self.cancel_remote(subscription).await {
            warn!(
                successor_id = %successor.subscription_id,
                "Gateway refused the cancel, rolling back the deferred successor"
            );
            if let Err(rollback_err) =
                self.cancel_current(&mut successor, Timeframe::Now).await
            {
                error!(
                    successor_id = %successor.subscription_id,
                    error = %rollback_err,
                    "Deferred successor could not be rolled back"
                );
            }
            return Err(err);
        }

        subscription.state = SubscriptionState::Changed;
        subscription.successor_id = Some(successor.subscription_id);
        subscription.modify_on = Some(renewal_on);
        subscription.touch();
        self.persist_update(subscription, "deferred plan change", true)
            .await?;

        info!(
            successor_id = %successor.subscription_id,
            modify_on = %renewal_on,
            "Plan change deferred to renewal"
        );
        Ok(successor)
    }

    /// Cancel the successor of a `Changed` record. The record's own profile
    /// is never touched here; it was cancelled when `Changed` was entered.
    async fn cancel_successor(
        &self,
        subscription: &Subscription,
    ) -> Result<(), SubscriptionError> {
        let successor_id = subscription.successor_id.ok_or_else(|| {
            SubscriptionError::Configuration(anyhow!(
                "changed subscription {} has no successor link",
                subscription.subscription_id
            ))
        })?;
        let mut successor = self
            .store
            .find(successor_id)
            .await
            .map_err(SubscriptionError::Storage)?
            .ok_or(SubscriptionError::NotFound(successor_id))?;

        match successor.state {
            SubscriptionState::Cancelled | SubscriptionState::Inactive => Ok(()),
            _ => self.cancel_current(&mut successor, Timeframe::Now).await,
        }
    }

    async fn cancel_current(
        &self,
        subscription: &mut Subscription,
        timeframe: Timeframe,
    ) -> Result<(), SubscriptionError> {
        let next_due = self.cancel_remote(subscription).await?;
        let remote_changed = subscription.profile_id.is_some();
        self.finish_cancel(subscription, timeframe, next_due, remote_changed)
            .await
    }

    /// Cancel the record's remote profile if the gateway still reports it
    /// as live. Returns the next billing date captured before the cancel,
    /// which becomes unreadable afterwards.
    async fn cancel_remote(
        &self,
        subscription: &Subscription,
    ) -> Result<Option<DateTime<Utc>>, SubscriptionError> {
        let Some(profile_id) = subscription.profile_id.as_deref() else {
            return Ok(None);
        };

        let details = self.gateway.profile_details(profile_id).await?;
        // TODO: gateway-side Pending profiles are skipped like cancelled
        // ones here; confirm they never need an explicit cancel.
        if details.status.is_cancellable() {
            self.gateway.cancel_profile(profile_id).await?;
            info!(profile_id = %profile_id, "Remote profile cancelled");
        } else {
            info!(
                profile_id = %profile_id,
                status = %details.status,
                "Remote profile already inactive, skipping cancel"
            );
        }
        Ok(details.next_billing_date)
    }

    /// Apply the local side of a cancel after the remote profile is gone.
    async fn finish_cancel(
        &self,
        subscription: &mut Subscription,
        timeframe: Timeframe,
        next_due: Option<DateTime<Utc>>,
        remote_changed: bool,
    ) -> Result<(), SubscriptionError> {
        match timeframe {
            Timeframe::Now => {
                subscription.state = SubscriptionState::Inactive;
                subscription.touch();
                // The remote side is already cancelled; the hook fires even
                // if the write below fails.
                self.hooks.on_deactivate(subscription).await;
            }
            Timeframe::Renewal => {
                subscription.state = SubscriptionState::Cancelled;
                subscription.modify_on = next_due;
                subscription.touch();
            }
        }

        self.persist_update(subscription, "cancel", remote_changed)
            .await?;
        info!(
            subscription_id = %subscription.subscription_id,
            state = %subscription.state,
            "Subscription cancelled"
        );
        Ok(())
    }

    /// Persist an update, escalating to a consistency alarm when remote
    /// state already moved in this operation.
    async fn persist_update(
        &self,
        subscription: &Subscription,
        context: &str,
        remote_changed: bool,
    ) -> Result<(), SubscriptionError> {
        match self.store.update(subscription).await {
            Ok(()) => Ok(()),
            Err(err) if remote_changed => {
                error!(
                    subscription_id = %subscription.subscription_id,
                    error = %err,
                    "Remote gateway state changed but local persistence failed"
                );
                Err(SubscriptionError::ConsistencyAlarm {
                    subscription_id: subscription.subscription_id,
                    detail: format!("{context}: {err}"),
                })
            }
            Err(err) => Err(SubscriptionError::Storage(err)),
        }
    }
}
