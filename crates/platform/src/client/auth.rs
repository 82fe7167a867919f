use chrono::Utc;
use model::{
    activity::ActivityKind,
    company::Company,
    notification::NotificationKind,
    user::{LoginForm, PasswordChangeForm, RegistrationForm, Role, Session, User},
    validation::normalize_email,
    Validate, ValidationErrors, WithId,
};
use serde::Serialize;

use super::{ensure_available, notify, record, settings, Actor, Client};
use crate::{
    database::{
        Database, DatabaseOperations, DatabaseTransaction, Repo, SessionRepo, UserRepo,
    },
    not_found_to_none, security, RequestError, RequestResult,
};

pub const BAD_CREDENTIALS: &str = "Email ou mot de passe incorrect";
pub const EMAIL_TAKEN: &str = "Un compte existe déjà avec cette adresse email";
pub const REGISTRATIONS_CLOSED: &str = "Les inscriptions sont actuellement fermées";
pub const ACCOUNT_DISABLED: &str = "Ce compte est désactivé";

/// The authenticated user together with its company, if any.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub user: WithId<User>,
    pub company: Option<WithId<Company>>,
}

/// Hashing is slow on purpose, keep it off the async workers.
pub(crate) async fn hash_password(password: String) -> RequestResult<String> {
    tokio::task::spawn_blocking(move || security::hash_password(&password))
        .await
        .map_err(RequestError::other)?
}

pub(crate) async fn verify_password(password: String, hash: String) -> RequestResult<bool> {
    tokio::task::spawn_blocking(move || security::verify_password(&password, &hash))
        .await
        .map_err(RequestError::other)
}

async fn company_of_user<O>(ops: &mut O, user: &WithId<User>) -> RequestResult<Option<WithId<Company>>>
where
    O: DatabaseOperations,
{
    match user.content.company_id {
        Some(company_id) => not_found_to_none(ops.get(&company_id).await.map_err(RequestError::from)),
        None => Ok(None),
    }
}

impl<D> Client<D>
where
    D: Database,
{
    pub async fn register(&self, form: RegistrationForm) -> RequestResult<SessionInfo> {
        form.validate()?;
        let password_hash = hash_password(form.password.clone()).await?;

        let mut tx = self.database.transaction().await?;
        let settings = settings(&mut tx).await?;
        ensure_available(&settings)?;
        if !settings.allow_registrations {
            return Err(RequestError::forbidden(REGISTRATIONS_CLOSED));
        }
        let email = normalize_email(&form.email);
        if tx.user_by_email(&email).await?.is_some() {
            return Err(RequestError::conflict(EMAIL_TAKEN));
        }

        let user = tx
            .insert(User::new(
                &email,
                &form.full_name,
                form.phone.as_deref(),
                form.role,
                None,
            ))
            .await?;
        tx.set_password_hash(&user.id, &password_hash).await?;

        let info = match (form.role, form.company) {
            (Role::Patron, Some(company_form)) => {
                let company = tx.insert(Company::pending(user.id, company_form)).await?;
                let user = tx
                    .update(user.map(|user| User {
                        company_id: Some(company.id),
                        ..user
                    }))
                    .await?;
                for admin in tx.users(Some(Role::Admin)).await? {
                    notify(
                        &mut tx,
                        &admin.id,
                        NotificationKind::CompanyRegistered,
                        "Nouvelle compagnie",
                        format!(
                            "La compagnie {} attend votre validation.",
                            company.content.name
                        ),
                    )
                    .await?;
                }
                record(
                    &mut tx,
                    Some(company.id),
                    Some(&Actor::new(user.clone())),
                    ActivityKind::CompanyRegistered,
                    format!("Inscription de la compagnie {}", company.content.name),
                )
                .await?;
                SessionInfo {
                    user,
                    company: Some(company),
                }
            }
            _ => SessionInfo {
                user,
                company: None,
            },
        };
        tx.commit().await?;
        log::info!(
            "registered user {} with role {:?}",
            info.user.id,
            info.user.content.role
        );
        Ok(info)
    }

    pub async fn login(&self, form: LoginForm) -> RequestResult<(Session, SessionInfo)> {
        let email = normalize_email(&form.email);
        let mut auto = self.database.auto().await?;
        let user = auto.user_by_email(&email).await?;
        let hash = match &user {
            Some(user) => auto.password_hash(&user.id).await?,
            None => None,
        };
        let (user, hash) = match (user, hash) {
            (Some(user), Some(hash)) => (user, hash),
            _ => {
                verify_password(form.password, security::dummy_password_hash().to_owned())
                    .await?;
                return Err(RequestError::Unauthorized(BAD_CREDENTIALS.to_owned()));
            }
        };
        if !verify_password(form.password, hash).await? {
            log::debug!("failed login for user {}", user.id);
            return Err(RequestError::Unauthorized(BAD_CREDENTIALS.to_owned()));
        }
        if !user.content.is_active() {
            return Err(RequestError::forbidden(ACCOUNT_DISABLED));
        }

        let now = Utc::now();
        let session = auto
            .put_session(Session {
                token: security::new_session_token(),
                user_id: user.id,
                created_at: now,
                expires_at: now + self.session_ttl(),
            })
            .await?;
        let company = company_of_user(&mut auto, &user).await?;
        log::info!("user {} logged in", user.id);
        Ok((session, SessionInfo { user, company }))
    }

    pub async fn logout(&self, token: &str) -> RequestResult<()> {
        self.database.auto().await?.delete_session(token).await?;
        Ok(())
    }

    /// Resolves a session token to the acting user. Expired sessions and
    /// sessions of disabled accounts are removed.
    pub async fn authenticate(&self, token: &str) -> RequestResult<Actor> {
        let mut auto = self.database.auto().await?;
        let session = auto
            .session(token)
            .await?
            .ok_or_else(RequestError::unauthenticated)?;
        if session.is_expired(Utc::now()) {
            auto.delete_session(token).await?;
            return Err(RequestError::unauthenticated());
        }
        let user = not_found_to_none(auto.get(&session.user_id).await.map_err(RequestError::from))?;
        match user {
            Some(user) if user.content.is_active() => Ok(Actor::new(user)),
            _ => {
                auto.delete_session(token).await?;
                Err(RequestError::unauthenticated())
            }
        }
    }

    pub async fn session_info(&self, actor: &Actor) -> RequestResult<SessionInfo> {
        let mut auto = self.database.auto().await?;
        let company = company_of_user(&mut auto, &actor.user).await?;
        Ok(SessionInfo {
            user: actor.user.clone(),
            company,
        })
    }

    /// Replaces the password and signs out every other session of the user.
    pub async fn change_password(
        &self,
        actor: &Actor,
        current_token: Option<&str>,
        form: PasswordChangeForm,
    ) -> RequestResult<()> {
        form.validate()?;
        let mut tx = self.database.transaction().await?;
        let hash = tx.password_hash(&actor.id()).await?.unwrap_or_default();
        if !verify_password(form.current_password, hash).await? {
            return Err(RequestError::invalid(
                "currentPassword",
                "Le mot de passe actuel est incorrect",
            ));
        }
        let new_hash = hash_password(form.new_password).await?;
        tx.set_password_hash(&actor.id(), &new_hash).await?;
        let dropped = tx.delete_sessions_of(&actor.id(), current_token).await?;
        tx.commit().await?;
        log::info!(
            "user {} changed the password, {} other sessions closed",
            actor.id(),
            dropped
        );
        Ok(())
    }

    /// Creates the first administrator unless a user with that email exists.
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> RequestResult<Option<WithId<User>>> {
        let mut errors = ValidationErrors::new();
        errors
            .email("email", email)
            .password("password", password)
            .text("fullName", full_name, 2, 100);
        errors.into_result()?;

        let email = normalize_email(email);
        let mut tx = self.database.transaction().await?;
        if tx.user_by_email(&email).await?.is_some() {
            log::info!("administrator {} already exists", email);
            return Ok(None);
        }
        let user = tx
            .insert(User::new(&email, full_name, None, Role::Admin, None))
            .await?;
        tx.set_password_hash(&user.id, &hash_password(password.to_owned()).await?)
            .await?;
        tx.commit().await?;
        log::info!("created administrator {}", email);
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use model::{company::CompanyStatus, settings::SystemSettings};

    use super::*;
    use crate::{
        client::testing::{self, PASSWORD},
        database::NotificationRepo,
    };

    fn login_form(email: &str, password: &str) -> LoginForm {
        LoginForm {
            email: email.to_owned(),
            password: password.to_owned(),
        }
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let client = testing::client();
        let form = RegistrationForm {
            password: "1234567".to_owned(),
            ..testing::registration("awa@example.sn", Role::Client)
        };
        match client.register(form).await {
            Err(RequestError::Validation(errors)) => assert_eq!(
                errors.message_for("password"),
                Some("Le mot de passe doit contenir au moins 8 caractères")
            ),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn patron_registration_creates_pending_company_and_notifies_admins() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        let info = client
            .register(testing::registration("patron@example.sn", Role::Patron))
            .await
            .unwrap();
        let company = info.company.unwrap();
        assert_eq!(company.content.status, CompanyStatus::Pending);
        assert_eq!(company.content.owner_id, info.user.id);
        assert_eq!(info.user.content.company_id, Some(company.id));

        let notifications = client
            .database
            .auto()
            .await
            .unwrap()
            .notifications_by_user(&admin.id(), false)
            .await
            .unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(
            notifications[0].content.kind,
            NotificationKind::CompanyRegistered
        );
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let client = testing::client();
        testing::customer(&client, "awa@example.sn").await;
        let result = client
            .register(testing::registration(" AWA@example.sn", Role::Client))
            .await;
        assert!(matches!(result, Err(RequestError::Conflict(message)) if message == EMAIL_TAKEN));
    }

    #[tokio::test]
    async fn closed_registrations_and_maintenance() {
        let client = testing::client();
        let admin = testing::admin(&client).await;
        client
            .update_settings(
                &admin,
                SystemSettings {
                    allow_registrations: false,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let result = client
            .register(testing::registration("awa@example.sn", Role::Client))
            .await;
        assert!(matches!(result, Err(RequestError::Forbidden(_))));

        client
            .update_settings(
                &admin,
                SystemSettings {
                    maintenance_mode: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let result = client
            .register(testing::registration("awa@example.sn", Role::Client))
            .await;
        assert!(matches!(result, Err(RequestError::Unavailable)));
    }

    #[tokio::test]
    async fn login_authenticate_logout() {
        let client = testing::client();
        let customer = testing::customer(&client, "awa@example.sn").await;

        let wrong = client.login(login_form("awa@example.sn", "mauvais!")).await;
        assert!(matches!(wrong, Err(RequestError::Unauthorized(message)) if message == BAD_CREDENTIALS));
        let unknown = client.login(login_form("nobody@example.sn", PASSWORD)).await;
        assert!(matches!(unknown, Err(RequestError::Unauthorized(message)) if message == BAD_CREDENTIALS));

        let (session, info) = client
            .login(login_form("Awa@Example.sn", PASSWORD))
            .await
            .unwrap();
        assert_eq!(info.user.id, customer.id());
        assert_eq!(session.token.len(), 64);

        let actor = client.authenticate(&session.token).await.unwrap();
        assert_eq!(actor.id(), customer.id());

        client.logout(&session.token).await.unwrap();
        assert!(matches!(
            client.authenticate(&session.token).await,
            Err(RequestError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected() {
        let client = testing::client().with_session_ttl(Duration::zero());
        testing::customer(&client, "awa@example.sn").await;
        let (session, _) = client
            .login(login_form("awa@example.sn", PASSWORD))
            .await
            .unwrap();
        assert!(client.authenticate(&session.token).await.is_err());
        let stored = client
            .database
            .auto()
            .await
            .unwrap()
            .session(&session.token)
            .await
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn changing_the_password_closes_other_sessions() {
        let client = testing::client();
        testing::customer(&client, "awa@example.sn").await;
        let (first, _) = client
            .login(login_form("awa@example.sn", PASSWORD))
            .await
            .unwrap();
        let (second, _) = client
            .login(login_form("awa@example.sn", PASSWORD))
            .await
            .unwrap();
        let actor = client.authenticate(&first.token).await.unwrap();

        let wrong_current = client
            .change_password(
                &actor,
                Some(&first.token),
                PasswordChangeForm {
                    current_password: "pas le bon".to_owned(),
                    new_password: "nouveau-secret".to_owned(),
                },
            )
            .await;
        assert!(matches!(wrong_current, Err(RequestError::Validation(_))));

        client
            .change_password(
                &actor,
                Some(&first.token),
                PasswordChangeForm {
                    current_password: PASSWORD.to_owned(),
                    new_password: "nouveau-secret".to_owned(),
                },
            )
            .await
            .unwrap();
        assert!(client.authenticate(&first.token).await.is_ok());
        assert!(client.authenticate(&second.token).await.is_err());
        assert!(client
            .login(login_form("awa@example.sn", "nouveau-secret"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn bootstrap_admin_runs_once() {
        let client = testing::client();
        assert!(client
            .bootstrap_admin("admin@busline.sn", PASSWORD, "Admin")
            .await
            .unwrap()
            .is_some());
        assert!(client
            .bootstrap_admin("admin@busline.sn", PASSWORD, "Admin")
            .await
            .unwrap()
            .is_none());
    }
}
