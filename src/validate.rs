//! Field-level input checking shared by the request types.
//!
//! Each request collects every problem it finds into a [`Checker`] and turns
//! it into a single [`AppError::Validation`] so clients see all reasons at once.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{AppError, FieldErrors};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_INTEGER: &str = "A valid integer is required.";
pub const INVALID_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("email regex")
});

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username regex"));

/// Integers arrive either as JSON numbers or as numeric strings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum IntInput {
    Int(i64),
    Text(String),
}

impl IntInput {
    pub fn parse(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }

    pub fn raw(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

#[derive(Default, Debug)]
pub struct Checker {
    errors: FieldErrors,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, msg: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(msg.into());
    }

    #[cfg(test)]
    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Required, non-blank string no longer than `max_len` characters.
    pub fn text(&mut self, field: &str, value: Option<&str>, max_len: Option<usize>) -> Option<String> {
        match value {
            None => {
                self.add(field, REQUIRED);
                None
            }
            Some(v) => self.present_text(field, v, max_len),
        }
    }

    /// Required, non-empty secret kept exactly as sent; whitespace is part of
    /// a password.
    pub fn secret(&mut self, field: &str, value: Option<&str>, max_len: usize) -> Option<String> {
        let Some(value) = value else {
            self.add(field, REQUIRED);
            return None;
        };
        if value.is_empty() {
            self.add(field, BLANK);
            return None;
        }
        if value.chars().count() > max_len {
            self.add(
                field,
                format!("Ensure this field has no more than {} characters.", max_len),
            );
            return None;
        }
        Some(value.to_string())
    }

    /// Like [`Checker::text`] but absence is fine; used by partial updates.
    pub fn optional_text(
        &mut self,
        field: &str,
        value: Option<&str>,
        max_len: Option<usize>,
    ) -> Option<String> {
        value.and_then(|v| self.present_text(field, v, max_len))
    }

    /// Optional text where an empty string clears the stored value.
    /// `None` means the field was absent or invalid.
    pub fn blankable(&mut self, field: &str, value: Option<&str>, max_len: usize) -> Option<Option<String>> {
        let value = value?.trim();
        if value.chars().count() > max_len {
            self.add(
                field,
                format!("Ensure this field has no more than {} characters.", max_len),
            );
            return None;
        }
        Some((!value.is_empty()).then(|| value.to_string()))
    }

    fn present_text(&mut self, field: &str, value: &str, max_len: Option<usize>) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, BLANK);
            return None;
        }
        if let Some(max) = max_len {
            if value.chars().count() > max {
                self.add(
                    field,
                    format!("Ensure this field has no more than {} characters.", max),
                );
                return None;
            }
        }
        Some(value.to_string())
    }

    /// Required integer within the inclusive bounds.
    pub fn int(&mut self, field: &str, value: Option<&IntInput>, min: Option<i64>, max: Option<i64>) -> Option<i64> {
        let Some(input) = value else {
            self.add(field, REQUIRED);
            return None;
        };
        let Some(v) = input.parse() else {
            self.add(field, INVALID_INTEGER);
            return None;
        };
        if let Some(min) = min {
            if v < min {
                self.add(field, format!("Ensure this value is greater than or equal to {}.", min));
                return None;
            }
        }
        if let Some(max) = max {
            if v > max {
                self.add(field, format!("Ensure this value is less than or equal to {}.", max));
                return None;
            }
        }
        Some(v)
    }

    pub fn date(&mut self, field: &str, value: Option<&str>) -> Option<NaiveDate> {
        let Some(v) = value else {
            self.add(field, REQUIRED);
            return None;
        };
        self.present_date(field, v)
    }

    pub fn optional_date(&mut self, field: &str, value: Option<&str>) -> Option<NaiveDate> {
        value.and_then(|v| self.present_date(field, v))
    }

    fn present_date(&mut self, field: &str, value: &str) -> Option<NaiveDate> {
        match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                self.add(field, INVALID_DATE);
                None
            }
        }
    }

    pub fn email(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let value = value?;
        if EMAIL_RE.is_match(&value) {
            Some(value.to_lowercase())
        } else {
            self.add(field, INVALID_EMAIL);
            None
        }
    }

    pub fn username(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let value = value?;
        if USERNAME_RE.is_match(&value) {
            Some(value)
        } else {
            self.add(field, INVALID_USERNAME);
            None
        }
    }

    /// Hands back the checked values, or every collected field error.
    /// Each check that yields `None` records an error, so `value` is only
    /// missing when the caller combined the fields incorrectly.
    pub fn finish<T>(self, value: Option<T>) -> Result<T, AppError> {
        if !self.errors.is_empty() {
            return Err(AppError::Validation(self.errors));
        }
        value.ok_or_else(|| {
            log::error!("validated request produced no value");
            AppError::system_exception()
        })
    }
}
