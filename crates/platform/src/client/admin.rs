use chrono::Utc;
use futures::try_join;
use indexmap::IndexMap;
use model::{
    activity::{Activity, ActivityKind},
    alert::{AlertForm, SystemAlert},
    booking::BookingTotals,
    company::{Company, CompanyStatus, RejectionForm, SuspensionForm},
    count_by,
    loyalty::LoyaltyReward,
    notification::NotificationKind,
    settings::SystemSettings,
    subscription::SubscriptionPlan,
    user::{AccountStatus, Role, User, UserStatusForm},
    Validate, WithId,
};
use serde::Serialize;
use utility::id::Id;

use super::{notify, record, settings, Actor, Client};
use crate::{
    database::{
        ActivityRepo, AlertRepo, BookingRepo, CompanyRepo, Database, DatabaseTransaction,
        LoyaltyRepo, Repo, SessionRepo, SettingsRepo, SubscriptionRepo, UserRepo,
    },
    RequestError, RequestResult,
};

pub const INVALID_TRANSITION: &str = "Transition de statut invalide";
pub const OWN_STATUS: &str = "Vous ne pouvez pas modifier votre propre statut";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub companies_by_status: IndexMap<CompanyStatus, usize>,
    pub users_by_role: IndexMap<Role, usize>,
    pub bookings: BookingTotals,
    pub unresolved_alerts: usize,
}

/// A review decision taken on a company.
#[derive(Debug, Clone)]
enum Review {
    Approve,
    Reject(String),
    Suspend(Option<String>),
    Reactivate,
}

impl Review {
    fn target(&self) -> CompanyStatus {
        match self {
            Review::Approve | Review::Reactivate => CompanyStatus::Approved,
            Review::Reject(_) => CompanyStatus::Rejected,
            Review::Suspend(_) => CompanyStatus::Suspended,
        }
    }

    /// `Approve` and `Reactivate` lead to the same status but from different ones.
    fn allowed_from(&self, current: CompanyStatus) -> bool {
        match self {
            Review::Approve => matches!(current, CompanyStatus::Pending | CompanyStatus::Rejected),
            Review::Reactivate => current == CompanyStatus::Suspended,
            _ => current.can_become(self.target()),
        }
    }

    fn apply(&self, company: Company) -> Company {
        match self {
            Review::Reject(reason) => Company {
                status: CompanyStatus::Rejected,
                rejection_reason: Some(reason.trim().to_owned()),
                ..company
            },
            _ => Company {
                status: self.target(),
                rejection_reason: None,
                ..company
            },
        }
    }

    fn notification(&self, company: &Company) -> (NotificationKind, &'static str, String) {
        match self {
            Review::Approve => (
                NotificationKind::CompanyApproved,
                "Compagnie approuvée",
                format!(
                    "Votre compagnie {} a été approuvée. Vous pouvez maintenant gérer votre flotte.",
                    company.name
                ),
            ),
            Review::Reject(reason) => (
                NotificationKind::CompanyRejected,
                "Compagnie refusée",
                format!(
                    "L'inscription de votre compagnie {} a été refusée : {}",
                    company.name,
                    reason.trim()
                ),
            ),
            Review::Suspend(reason) => (
                NotificationKind::CompanySuspended,
                "Compagnie suspendue",
                match reason {
                    Some(reason) => format!(
                        "Votre compagnie {} a été suspendue : {}",
                        company.name,
                        reason.trim()
                    ),
                    None => format!("Votre compagnie {} a été suspendue.", company.name),
                },
            ),
            Review::Reactivate => (
                NotificationKind::CompanyReactivated,
                "Compagnie réactivée",
                format!("Votre compagnie {} a été réactivée.", company.name),
            ),
        }
    }
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn companies(
        &self,
        actor: &Actor,
        status: Option<CompanyStatus>,
    ) -> RequestResult<Vec<WithId<Company>>> {
        actor.require_admin()?;
        Ok(self.database.auto().await?.companies(status).await?)
    }

    pub async fn company(&self, actor: &Actor, id: &Id<Company>) -> RequestResult<WithId<Company>> {
        actor.require_admin()?;
        Ok(self.database.auto().await?.get(id).await?)
    }

    async fn review_company(
        &self,
        actor: &Actor,
        id: &Id<Company>,
        review: Review,
    ) -> RequestResult<WithId<Company>> {
        actor.require_admin()?;
        let mut tx = self.database.transaction().await?;
        let company: WithId<Company> = tx.get(id).await?;
        if !review.allowed_from(company.content.status) {
            return Err(RequestError::conflict(INVALID_TRANSITION));
        }
        let previous = company.content.status;
        let company = tx.update(company.map(|company| review.apply(company))).await?;

        let (kind, title, message) = review.notification(&company.content);
        notify(&mut tx, &company.content.owner_id, kind, title, message).await?;
        record(
            &mut tx,
            Some(company.id),
            Some(actor),
            ActivityKind::CompanyReviewed,
            format!(
                "Compagnie {} : {:?} → {:?}",
                company.content.name, previous, company.content.status
            ),
        )
        .await?;
        tx.commit().await?;
        log::info!(
            "company {} changed from {:?} to {:?} by {}",
            company.id,
            previous,
            company.content.status,
            actor.id()
        );
        Ok(company)
    }

    pub async fn approve_company(
        &self,
        actor: &Actor,
        id: &Id<Company>,
    ) -> RequestResult<WithId<Company>> {
        self.review_company(actor, id, Review::Approve).await
    }

    pub async fn reject_company(
        &self,
        actor: &Actor,
        id: &Id<Company>,
        form: RejectionForm,
    ) -> RequestResult<WithId<Company>> {
        actor.require_admin()?;
        form.validate()?;
        self.review_company(actor, id, Review::Reject(form.reason))
            .await
    }

    pub async fn suspend_company(
        &self,
        actor: &Actor,
        id: &Id<Company>,
        form: SuspensionForm,
    ) -> RequestResult<WithId<Company>> {
        actor.require_admin()?;
        form.validate()?;
        self.review_company(actor, id, Review::Suspend(form.reason))
            .await
    }

    pub async fn reactivate_company(
        &self,
        actor: &Actor,
        id: &Id<Company>,
    ) -> RequestResult<WithId<Company>> {
        self.review_company(actor, id, Review::Reactivate).await
    }
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn users(&self, actor: &Actor, role: Option<Role>) -> RequestResult<Vec<WithId<User>>> {
        actor.require_admin()?;
        Ok(self.database.auto().await?.users(role).await?)
    }

    pub async fn set_user_status(
        &self,
        actor: &Actor,
        id: &Id<User>,
        form: UserStatusForm,
    ) -> RequestResult<WithId<User>> {
        actor.require_admin()?;
        if *id == actor.id() {
            return Err(RequestError::forbidden(OWN_STATUS));
        }
        let mut tx = self.database.transaction().await?;
        let user: WithId<User> = tx.get(id).await?;
        let user = tx
            .update(user.map(|user| User {
                status: form.status,
                ..user
            }))
            .await?;
        if form.status != AccountStatus::Active {
            tx.delete_sessions_of(&user.id, None).await?;
        }
        record(
            &mut tx,
            user.content.company_id,
            Some(actor),
            ActivityKind::UserStatusChanged,
            format!("Statut de {} : {:?}", user.content.email, form.status),
        )
        .await?;
        tx.commit().await?;
        Ok(user)
    }
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn settings(&self, actor: &Actor) -> RequestResult<SystemSettings> {
        actor.require_admin()?;
        settings(&mut self.database.auto().await?).await
    }

    pub async fn update_settings(
        &self,
        actor: &Actor,
        form: SystemSettings,
    ) -> RequestResult<SystemSettings> {
        actor.require_admin()?;
        form.validate()?;
        let mut tx = self.database.transaction().await?;
        let settings = tx.put_settings(form).await?;
        record(
            &mut tx,
            None,
            Some(actor),
            ActivityKind::SettingsUpdated,
            "Paramètres de la plateforme mis à jour".to_owned(),
        )
        .await?;
        tx.commit().await?;
        if settings.maintenance_mode {
            log::warn!("maintenance mode enabled by {}", actor.id());
        }
        Ok(settings)
    }

    pub async fn alerts(
        &self,
        actor: &Actor,
        include_resolved: bool,
    ) -> RequestResult<Vec<WithId<SystemAlert>>> {
        actor.require_admin()?;
        Ok(self.database.auto().await?.alerts(include_resolved).await?)
    }

    pub async fn create_alert(
        &self,
        actor: &Actor,
        form: AlertForm,
    ) -> RequestResult<WithId<SystemAlert>> {
        actor.require_admin()?;
        form.validate()?;
        Ok(self
            .database
            .auto()
            .await?
            .insert(SystemAlert::from_form(form))
            .await?)
    }

    pub async fn resolve_alert(
        &self,
        actor: &Actor,
        id: &Id<SystemAlert>,
    ) -> RequestResult<WithId<SystemAlert>> {
        actor.require_admin()?;
        let mut auto = self.database.auto().await?;
        let alert: WithId<SystemAlert> = auto.get(id).await?;
        if alert.content.resolved {
            return Ok(alert);
        }
        let now = Utc::now();
        Ok(auto.update(alert.map(|alert| alert.resolve(now))).await?)
    }

    pub async fn admin_dashboard(&self, actor: &Actor) -> RequestResult<AdminDashboard> {
        actor.require_admin()?;
        let (companies, users, bookings, alerts) = try_join!(
            async { self.database.auto().await?.companies(None).await },
            async { self.database.auto().await?.users(None).await },
            async { self.database.auto().await?.booking_totals(None).await },
            async { self.database.auto().await?.alerts(false).await },
        )?;
        Ok(AdminDashboard {
            companies_by_status: count_by(&CompanyStatus::ALL, &companies, |company| {
                company.content.status
            }),
            users_by_role: count_by(&Role::ALL, &users, |user| user.content.role),
            bookings,
            unresolved_alerts: alerts.len(),
        })
    }

    pub async fn activities(&self, actor: &Actor, limit: i64) -> RequestResult<Vec<WithId<Activity>>> {
        actor.require_admin()?;
        Ok(self.database.auto().await?.activities(None, limit).await?)
    }
}

impl<D> Client<D>
where
    D: Database,
{
    /// All rewards for administrators, active ones for everybody else.
    pub async fn rewards(&self, actor: &Actor) -> RequestResult<Vec<WithId<LoyaltyReward>>> {
        let active_only = !actor.is(Role::Admin);
        Ok(self.database.auto().await?.rewards(active_only).await?)
    }

    pub async fn create_reward(
        &self,
        actor: &Actor,
        reward: LoyaltyReward,
    ) -> RequestResult<WithId<LoyaltyReward>> {
        actor.require_admin()?;
        reward.validate()?;
        Ok(self.database.auto().await?.insert(reward).await?)
    }

    pub async fn update_reward(
        &self,
        actor: &Actor,
        id: &Id<LoyaltyReward>,
        reward: LoyaltyReward,
    ) -> RequestResult<WithId<LoyaltyReward>> {
        actor.require_admin()?;
        reward.validate()?;
        Ok(self
            .database
            .auto()
            .await?
            .update(WithId::new(*id, reward))
            .await?)
    }

    /// Active plans, public.
    pub async fn plans(&self) -> RequestResult<Vec<WithId<SubscriptionPlan>>> {
        Ok(self.database.auto().await?.plans(true).await?)
    }

    pub async fn all_plans(&self, actor: &Actor) -> RequestResult<Vec<WithId<SubscriptionPlan>>> {
        actor.require_admin()?;
        Ok(self.database.auto().await?.plans(false).await?)
    }

    pub async fn create_plan(
        &self,
        actor: &Actor,
        plan: SubscriptionPlan,
    ) -> RequestResult<WithId<SubscriptionPlan>> {
        actor.require_admin()?;
        plan.validate()?;
        Ok(self.database.auto().await?.insert(plan).await?)
    }

    pub async fn update_plan(
        &self,
        actor: &Actor,
        id: &Id<SubscriptionPlan>,
        plan: SubscriptionPlan,
    ) -> RequestResult<WithId<SubscriptionPlan>> {
        actor.require_admin()?;
        plan.validate()?;
        Ok(self
            .database
            .auto()
            .await?
            .update(WithId::new(*id, plan))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use model::{alert::AlertSeverity, notification::Notification, ExampleData};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        client::testing::{self, PASSWORD},
        database::NotificationRepo,
    };

    async fn owner_notifications<D: Database>(
        client: &Client<D>,
        owner: &Id<User>,
    ) -> Vec<WithId<Notification>> {
        client
            .database
            .auto()
            .await
            .unwrap()
            .notifications_by_user(owner, false)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn rejecting_a_pending_company_notifies_the_owner_once() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let patron = testing::pending_patron(&client, "patron@example.sn").await;
        let company_id = patron.company_id().unwrap();

        let company = client
            .reject_company(
                &admin,
                &company_id,
                RejectionForm {
                    reason: "Licence manquante".to_owned(),
                },
            )
            .await
            .unwrap();
        assert_eq!(company.content.status, CompanyStatus::Rejected);
        assert_eq!(
            company.content.rejection_reason.as_deref(),
            Some("Licence manquante")
        );

        let notifications = owner_notifications(&client, &patron.id()).await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].content.kind, NotificationKind::CompanyRejected);
    }

    #[tokio::test]
    async fn review_lifecycle() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let patron = testing::pending_patron(&client, "patron@example.sn").await;
        let id = patron.company_id().unwrap();

        let result = client.reactivate_company(&admin, &id).await;
        assert!(matches!(result, Err(RequestError::Conflict(message)) if message == INVALID_TRANSITION));

        let company = client.approve_company(&admin, &id).await.unwrap();
        assert_eq!(company.content.status, CompanyStatus::Approved);
        let result = client
            .reject_company(&admin, &id, RejectionForm { reason: "Trop tard".to_owned() })
            .await;
        assert!(matches!(result, Err(RequestError::Conflict(_))));

        let company = client
            .suspend_company(&admin, &id, SuspensionForm::default())
            .await
            .unwrap();
        assert_eq!(company.content.status, CompanyStatus::Suspended);
        let company = client.reactivate_company(&admin, &id).await.unwrap();
        assert_eq!(company.content.status, CompanyStatus::Approved);

        let kinds = owner_notifications(&client, &patron.id())
            .await
            .into_iter()
            .map(|notification| notification.content.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                NotificationKind::CompanyReactivated,
                NotificationKind::CompanySuspended,
                NotificationKind::CompanyApproved,
            ]
        );
    }

    #[tokio::test]
    async fn rejection_reason_is_validated() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let patron = testing::pending_patron(&client, "patron@example.sn").await;
        let result = client
            .reject_company(
                &admin,
                &patron.company_id().unwrap(),
                RejectionForm { reason: "".to_owned() },
            )
            .await;
        assert!(matches!(result, Err(RequestError::Validation(_))));
    }

    #[tokio::test]
    async fn admin_operations_need_the_admin_role() {
        let client = testing::client();
        let customer = testing::customer(&client, "awa@example.sn").await;
        assert!(matches!(
            client.companies(&customer, None).await,
            Err(RequestError::Forbidden(_))
        ));
        assert!(matches!(
            client.admin_dashboard(&customer).await,
            Err(RequestError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn deactivating_a_user_closes_the_sessions() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let (session, _) = client
            .login(model::user::LoginForm {
                email: "awa@example.sn".to_owned(),
                password: PASSWORD.to_owned(),
            })
            .await
            .unwrap();

        let user = client
            .set_user_status(
                &admin,
                &customer.id(),
                UserStatusForm {
                    status: AccountStatus::Suspended,
                },
            )
            .await
            .unwrap();
        assert_eq!(user.content.status, AccountStatus::Suspended);
        assert!(client.authenticate(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn admins_can_not_change_their_own_status() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        for status in [AccountStatus::Inactive, AccountStatus::Suspended] {
            let result = client
                .set_user_status(&admin, &admin.id(), UserStatusForm { status })
                .await;
            assert!(matches!(result, Err(RequestError::Forbidden(message)) if message == OWN_STATUS));
        }
        assert_eq!(
            testing::user(&client, &admin).await.content.status,
            AccountStatus::Active
        );
    }

    #[tokio::test]
    async fn alerts_resolve_once() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let alert = client
            .create_alert(
                &admin,
                AlertForm {
                    severity: AlertSeverity::Critical,
                    title: "Paiements indisponibles".to_owned(),
                    message: "Le prestataire de paiement ne répond plus.".to_owned(),
                },
            )
            .await
            .unwrap();
        assert_eq!(client.alerts(&admin, false).await.unwrap().len(), 1);

        let resolved = client.resolve_alert(&admin, &alert.id).await.unwrap();
        let again = client.resolve_alert(&admin, &alert.id).await.unwrap();
        assert_eq!(resolved.content.resolved_at, again.content.resolved_at);
        assert!(client.alerts(&admin, false).await.unwrap().is_empty());
        assert_eq!(client.alerts(&admin, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dashboard_counts() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        testing::pending_patron(&client, "one@example.sn").await;
        testing::patron(&client, "two@example.sn").await;
        testing::customer(&client, "awa@example.sn").await;

        let dashboard = client.admin_dashboard(&admin).await.unwrap();
        assert_eq!(dashboard.companies_by_status[&CompanyStatus::Pending], 1);
        assert_eq!(dashboard.companies_by_status[&CompanyStatus::Approved], 1);
        assert_eq!(dashboard.companies_by_status[&CompanyStatus::Rejected], 0);
        assert_eq!(dashboard.users_by_role[&Role::Patron], 2);
        assert_eq!(dashboard.users_by_role[&Role::Client], 1);
        assert_eq!(dashboard.users_by_role[&Role::Admin], 1);
        assert_eq!(dashboard.unresolved_alerts, 0);
    }

    #[tokio::test]
    async fn settings_default_until_saved() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        assert_eq!(client.settings(&admin).await.unwrap(), SystemSettings::default());
        let invalid = client
            .update_settings(
                &admin,
                SystemSettings {
                    max_seats_per_booking: 0,
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(invalid, Err(RequestError::Validation(_))));
    }

    #[tokio::test]
    async fn plans_and_rewards() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let customer = testing::customer(&client, "awa@example.sn").await;
        let plan = client
            .create_plan(&admin, SubscriptionPlan::example_data())
            .await
            .unwrap();
        client
            .update_plan(
                &admin,
                &plan.id,
                SubscriptionPlan {
                    active: false,
                    ..plan.content.clone()
                },
            )
            .await
            .unwrap();
        assert!(client.plans().await.unwrap().is_empty());
        assert_eq!(client.all_plans(&admin).await.unwrap().len(), 1);

        client
            .create_reward(
                &admin,
                LoyaltyReward {
                    active: false,
                    ..LoyaltyReward::example_data()
                },
            )
            .await
            .unwrap();
        assert!(client.rewards(&customer).await.unwrap().is_empty());
        assert_eq!(client.rewards(&admin).await.unwrap().len(), 1);
    }
}
