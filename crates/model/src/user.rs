use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};
use uuid::Uuid;

use crate::{
    company::{Company, CompanyForm},
    validation::{normalize_email, Validate, ValidationErrors},
    ExampleData,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Patron,
    Gestionnaire,
    Caissier,
    Client,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Patron,
        Role::Gestionnaire,
        Role::Caissier,
        Role::Client,
    ];

    pub fn is_employee_role(&self) -> bool {
        matches!(self, Role::Gestionnaire | Role::Caissier)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub company_id: Option<Id<Company>>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl HasId for User {
    type IdType = Uuid;
}

impl User {
    pub fn new(
        email: &str,
        full_name: &str,
        phone: Option<&str>,
        role: Role,
        company_id: Option<Id<Company>>,
    ) -> Self {
        Self {
            email: normalize_email(email),
            full_name: full_name.trim().to_owned(),
            phone: phone.map(|phone| phone.trim().to_owned()),
            role,
            company_id,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

impl ExampleData for User {
    fn example_data() -> Self {
        Self {
            email: "awa.diop@example.sn".to_owned(),
            full_name: "Awa Diop".to_owned(),
            phone: Some("+221 77 123 45 67".to_owned()),
            role: Role::Client,
            company_id: None,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: Id<User>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    #[serde(default = "RegistrationForm::default_role")]
    pub role: Role,
    pub company: Option<CompanyForm>,
}

impl RegistrationForm {
    fn default_role() -> Role {
        Role::Client
    }
}

impl Validate for RegistrationForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .text("fullName", &self.full_name, 2, 100)
            .email("email", &self.email)
            .password("password", &self.password)
            .phone("phone", self.phone.as_deref())
            .check(
                matches!(self.role, Role::Client | Role::Patron),
                "role",
                "Ce rôle ne peut pas être choisi à l'inscription",
            );
        if self.role == Role::Patron {
            match &self.company {
                Some(company) => {
                    if let Err(company_errors) = company.validate() {
                        errors.merge("company", company_errors);
                    }
                }
                None => errors.add("company", "Les informations de la compagnie sont obligatoires"),
            }
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeForm {
    pub current_password: String,
    pub new_password: String,
}

impl Validate for PasswordChangeForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.password("newPassword", &self.new_password).check(
            self.current_password != self.new_password,
            "newPassword",
            "Le nouveau mot de passe doit être différent de l'ancien",
        );
        errors.into_result()
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub role: Role,
}

impl Validate for EmployeeForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .text("fullName", &self.full_name, 2, 100)
            .email("email", &self.email)
            .password("password", &self.password)
            .phone("phone", self.phone.as_deref())
            .check(
                self.role.is_employee_role(),
                "role",
                "Le rôle doit être GESTIONNAIRE ou CAISSIER",
            );
        errors.into_result()
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdateForm {
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
}

impl Validate for EmployeeUpdateForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .text("fullName", &self.full_name, 2, 100)
            .phone("phone", self.phone.as_deref())
            .check(
                self.role.is_employee_role(),
                "role",
                "Le rôle doit être GESTIONNAIRE ou CAISSIER",
            );
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserStatusForm {
    pub status: AccountStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_form() -> RegistrationForm {
        RegistrationForm {
            full_name: "Awa Diop".to_owned(),
            email: "awa@example.sn".to_owned(),
            password: "motdepasse".to_owned(),
            phone: None,
            role: Role::Client,
            company: None,
        }
    }

    #[test]
    fn valid_client_registration() {
        assert!(client_form().validate().is_ok());
    }

    #[test]
    fn short_password_is_rejected() {
        let form = RegistrationForm {
            password: "court".to_owned(),
            ..client_form()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.message_for("password"),
            Some("Le mot de passe doit contenir au moins 8 caractères")
        );
    }

    #[test]
    fn staff_roles_can_not_self_register() {
        let form = RegistrationForm {
            role: Role::Caissier,
            ..client_form()
        };
        assert!(form.validate().unwrap_err().message_for("role").is_some());
    }

    #[test]
    fn patron_needs_company() {
        let form = RegistrationForm {
            role: Role::Patron,
            ..client_form()
        };
        assert!(form.validate().unwrap_err().message_for("company").is_some());
    }

    #[test]
    fn employee_role_must_be_staff() {
        let form = EmployeeForm {
            full_name: "Moussa Fall".to_owned(),
            email: "moussa@example.sn".to_owned(),
            password: "motdepasse".to_owned(),
            phone: None,
            role: Role::Admin,
        };
        assert!(form.validate().unwrap_err().message_for("role").is_some());
    }

    #[test]
    fn new_user_normalizes_email() {
        let user = User::new("  Awa@Example.SN ", " Awa ", None, Role::Client, None);
        assert_eq!(user.email, "awa@example.sn");
        assert_eq!(user.full_name, "Awa");
        assert!(user.is_active());
    }
}
