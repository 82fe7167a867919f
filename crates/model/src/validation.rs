use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All problems found in one submitted form, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = self
            .0
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "invalid fields ({})", fields)
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn merge(&mut self, prefix: &str, other: ValidationErrors) {
        for error in other.0 {
            self.add(format!("{}.{}", prefix, error.field), error.message);
        }
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn text(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let length = value.trim().chars().count();
        if length == 0 && min > 0 {
            self.add(field, "Ce champ est obligatoire");
        } else if length < min {
            self.add(
                field,
                format!("Ce champ doit contenir au moins {} caractères", min),
            );
        } else if length > max {
            self.add(
                field,
                format!("Ce champ ne doit pas dépasser {} caractères", max),
            );
        }
        self
    }

    pub fn optional_text(
        &mut self,
        field: &str,
        value: Option<&str>,
        max: usize,
    ) -> &mut Self {
        if let Some(value) = value {
            self.text(field, value, 0, max);
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !is_valid_email(value) {
            self.add(field, "Adresse email invalide");
        }
        self
    }

    pub fn phone(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            if !is_valid_phone(value) {
                self.add(field, "Numéro de téléphone invalide");
            }
        }
        self
    }

    pub fn password(&mut self, field: &str, value: &str) -> &mut Self {
        if value.chars().count() < MIN_PASSWORD_LENGTH {
            self.add(
                field,
                format!(
                    "Le mot de passe doit contenir au moins {} caractères",
                    MIN_PASSWORD_LENGTH
                ),
            );
        }
        self
    }

    pub fn range<T>(&mut self, field: &str, value: T, min: T, max: T) -> &mut Self
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            self.add(
                field,
                format!("La valeur doit être comprise entre {} et {}", min, max),
            );
        }
        self
    }

    pub fn positive<T>(&mut self, field: &str, value: T) -> &mut Self
    where
        T: PartialOrd + Default,
    {
        if value <= T::default() {
            self.add(field, "La valeur doit être positive");
        }
        self
    }

    pub fn check(&mut self, condition: bool, field: &str, message: &str) -> &mut Self {
        if !condition {
            self.add(field, message);
        }
        self
    }
}

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !value.contains(char::is_whitespace)
        && value.chars().count() <= 254
}

pub fn is_valid_phone(value: &str) -> bool {
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')' | '.'));
    allowed && (6..=15).contains(&digits)
}

/// Normalises an email address for storage and lookup.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}
