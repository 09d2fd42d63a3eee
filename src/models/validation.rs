//! Field-level validation for assets and descriptions.
//!
//! Every check runs; violations are collected rather than short-circuited.

use std::fmt;

use super::asset::{Asset, Audience, Chart, Insight};

pub const MAX_STRING_LENGTH: usize = 255;

pub const VALID_GENDERS: &[&str] = &["Male", "Female"];
pub const VALID_AGE_GROUPS: &[&str] = &["18-24", "25-34", "35-44", "45-54", "55+"];
pub const VALID_SOCIAL_MEDIA_HOURS: &[&str] = &["0-1", "1-3", "3-5", "5+"];

/// Aggregated field violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", self.0.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Default)]
struct Checks(Vec<String>);

impl Checks {
    fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.0.push(format!("{} is required", field));
        }
        self
    }

    fn max_length(&mut self, field: &str, value: &str) -> &mut Self {
        if value.chars().count() > MAX_STRING_LENGTH {
            self.0.push(format!(
                "{} exceeds maximum length of {}",
                field, MAX_STRING_LENGTH
            ));
        }
        self
    }

    fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) -> &mut Self {
        if !allowed.contains(&value) {
            self.0.push(format!(
                "{} has invalid value {:?} (allowed: {})",
                field,
                value,
                allowed.join(", ")
            ));
        }
        self
    }

    fn non_negative(&mut self, field: &str, value: i64) -> &mut Self {
        if value < 0 {
            self.0.push(format!("{} must not be negative", field));
        }
        self
    }

    fn finish(&mut self) -> Vec<String> {
        std::mem::take(&mut self.0)
    }
}

/// Return every violation in `asset`; an empty list means valid.
pub fn validate_asset(asset: &Asset) -> Vec<String> {
    match asset {
        Asset::Chart(c) => validate_chart(c),
        Asset::Insight(i) => validate_insight(i),
        Asset::Audience(a) => validate_audience(a),
    }
}

fn validate_chart(c: &Chart) -> Vec<String> {
    Checks::default()
        .required("id", &c.id)
        .max_length("id", &c.id)
        .required("title", &c.title)
        .max_length("title", &c.title)
        .required("x_axis_title", &c.x_axis_title)
        .max_length("x_axis_title", &c.x_axis_title)
        .required("y_axis_title", &c.y_axis_title)
        .max_length("y_axis_title", &c.y_axis_title)
        .finish()
}

fn validate_insight(i: &Insight) -> Vec<String> {
    Checks::default()
        .required("id", &i.id)
        .max_length("id", &i.id)
        .required("text", &i.text)
        .max_length("text", &i.text)
        .finish()
}

// Only the id is mandatory; the filters are checked when present.
fn validate_audience(a: &Audience) -> Vec<String> {
    let mut checks = Checks::default();
    checks
        .required("id", &a.id)
        .max_length("id", &a.id)
        .non_negative("purchases_last_month", a.purchases_last_month);

    for (i, gender) in a.gender.iter().enumerate() {
        checks.one_of(&format!("gender[{}]", i), gender, VALID_GENDERS);
    }
    for (i, country) in a.birth_country.iter().enumerate() {
        checks.required(&format!("birth_country[{}]", i), country);
    }
    for (i, group) in a.age_groups.iter().enumerate() {
        checks.one_of(&format!("age_groups[{}]", i), group, VALID_AGE_GROUPS);
    }
    if !a.social_media_hours_daily.is_empty() {
        checks.one_of(
            "social_media_hours_daily",
            &a.social_media_hours_daily,
            VALID_SOCIAL_MEDIA_HOURS,
        );
    }

    checks.finish()
}

/// Checks applied before a favourite is first stored.
pub fn check_new_favourite(asset: &Asset, description: &str) -> Result<(), ValidationErrors> {
    let mut errors = validate_asset(asset);
    errors.extend(
        Checks::default()
            .max_length("description", description)
            .finish(),
    );
    ValidationErrors(errors).into_result()
}

/// Checks applied to a replacement description.
pub fn check_description(description: &str) -> Result<(), ValidationErrors> {
    ValidationErrors(
        Checks::default()
            .required("description", description)
            .max_length("description", description)
            .finish(),
    )
    .into_result()
}

/// Checks applied to an asset id taken from the request path.
pub fn check_asset_id(asset_id: &str) -> Result<(), ValidationErrors> {
    ValidationErrors(Checks::default().required("asset_id", asset_id).finish()).into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(id: &str, title: &str, x: &str, y: &str) -> Asset {
        Asset::Chart(Chart {
            id: id.into(),
            title: title.into(),
            x_axis_title: x.into(),
            y_axis_title: y.into(),
            data: Default::default(),
        })
    }

    fn audience(f: impl FnOnce(&mut Audience)) -> Asset {
        let mut a = Audience {
            id: "a1".into(),
            ..Default::default()
        };
        f(&mut a);
        Asset::Audience(a)
    }

    #[test]
    fn test_valid_chart_passes() {
        assert!(validate_asset(&chart("c1", "Revenue", "Month", "USD")).is_empty());
    }

    #[test]
    fn test_chart_names_each_missing_field() {
        let cases = [
            (chart("", "Revenue", "Month", "USD"), "id is required"),
            (chart("c1", "", "Month", "USD"), "title is required"),
            (chart("c1", "Revenue", "", "USD"), "x_axis_title is required"),
            (chart("c1", "Revenue", "Month", ""), "y_axis_title is required"),
        ];
        for (asset, expected) in cases {
            let errors = validate_asset(&asset);
            assert_eq!(errors, vec![expected.to_string()]);
        }
    }

    #[test]
    fn test_all_violations_reported_together() {
        let errors = validate_asset(&chart("", "", "", ""));
        assert_eq!(
            errors,
            vec![
                "id is required",
                "title is required",
                "x_axis_title is required",
                "y_axis_title is required",
            ]
        );
    }

    #[test]
    fn test_length_limit_counts_characters() {
        let long = "a".repeat(256);
        let errors = validate_asset(&chart("c1", &long, "Month", "USD"));
        assert_eq!(errors, vec!["title exceeds maximum length of 255"]);

        let exact = "é".repeat(255);
        assert!(validate_asset(&chart("c1", &exact, "Month", "USD")).is_empty());
    }

    #[test]
    fn test_insight_rules() {
        let missing = Asset::Insight(Insight {
            id: "i1".into(),
            text: "  ".into(),
        });
        assert_eq!(validate_asset(&missing), vec!["text is required"]);

        let long = Asset::Insight(Insight {
            id: "i1".into(),
            text: "x".repeat(256),
        });
        assert_eq!(
            validate_asset(&long),
            vec!["text exceeds maximum length of 255"]
        );
    }

    #[test]
    fn test_audience_only_requires_id() {
        assert!(validate_asset(&audience(|_| {})).is_empty());
        let errors = validate_asset(&audience(|a| a.id.clear()));
        assert_eq!(errors, vec!["id is required"]);
    }

    #[test]
    fn test_audience_enumerations() {
        let errors = validate_asset(&audience(|a| {
            a.gender = vec!["Male".into(), "Other".into()];
            a.age_groups = vec!["10-17".into()];
            a.social_media_hours_daily = "10+".into();
        }));
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("gender[1] has invalid value \"Other\""));
        assert!(errors[1].starts_with("age_groups[0] has invalid value"));
        assert!(errors[2].starts_with("social_media_hours_daily has invalid value"));
    }

    #[test]
    fn test_audience_counts_and_countries() {
        let errors = validate_asset(&audience(|a| {
            a.purchases_last_month = -1;
            a.birth_country = vec!["GR".into(), "".into()];
        }));
        assert_eq!(
            errors,
            vec![
                "purchases_last_month must not be negative",
                "birth_country[1] is required",
            ]
        );
    }

    #[test]
    fn test_description_rules() {
        assert!(check_description("My favourite chart").is_ok());
        for bad in ["", "   "] {
            let err = check_description(bad).unwrap_err();
            assert_eq!(err.messages(), ["description is required"]);
        }
        let err = check_description(&"d".repeat(256)).unwrap_err();
        assert_eq!(err.to_string(), "validation failed: description exceeds maximum length of 255");
    }

    #[test]
    fn test_new_favourite_allows_empty_description() {
        let asset = chart("c1", "Revenue", "Month", "USD");
        assert!(check_new_favourite(&asset, "").is_ok());

        let err = check_new_favourite(&chart("", "Revenue", "Month", "USD"), &"d".repeat(300))
            .unwrap_err();
        assert_eq!(
            err.messages(),
            ["id is required", "description exceeds maximum length of 255"]
        );
    }

    #[test]
    fn test_asset_id_rules() {
        assert!(check_asset_id("asset123").is_ok());
        assert!(check_asset_id("").is_err());
        assert_eq!(
            check_asset_id("   ").unwrap_err().messages(),
            ["asset_id is required"]
        );
    }
}
