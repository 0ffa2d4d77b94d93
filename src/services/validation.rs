//! Request field validation helpers.
//!
//! Each helper checks one field and records a message in a [`FieldErrors`]
//! collector, so a request reports every bad field at once.

use chrono::{Datelike, NaiveDate};

use crate::error::FieldErrors;

/// Oldest year accepted for business dates.
pub const ANO_MINIMO: i32 = 1900;

/// Latest year accepted for business dates.
pub const ANO_MAXIMO: i32 = 9999;

/// Keep only ASCII digits: `"529.982.247-25"` becomes `"52998224725"`.
pub fn only_digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Trim and drop empty strings.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn required(errors: &mut FieldErrors, field: &'static str, value: &str, max_len: usize) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "is required");
    } else if trimmed.chars().count() > max_len {
        errors.add(field, format!("must be at most {max_len} characters"));
    }
}

pub fn max_len(errors: &mut FieldErrors, field: &'static str, value: Option<&str>, max_len: usize) {
    if let Some(value) = value {
        if value.chars().count() > max_len {
            errors.add(field, format!("must be at most {max_len} characters"));
        }
    }
}

/// Exactly or up to a number of digits, nothing else.
pub fn digits(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) {
    let all_digits = !value.is_empty() && value.chars().all(|c| c.is_ascii_digit());
    let len = value.len();
    if !all_digits || len < min || len > max {
        if min == max {
            errors.add(field, format!("must be exactly {min} digits"));
        } else {
            errors.add(field, format!("must be {min} to {max} digits"));
        }
    }
}

pub fn positive_i32(errors: &mut FieldErrors, field: &'static str, value: i32) {
    if value <= 0 {
        errors.add(field, "must be greater than zero");
    }
}

pub fn positive_i64(errors: &mut FieldErrors, field: &'static str, value: i64) {
    if value <= 0 {
        errors.add(field, "must be greater than zero");
    }
}

pub fn range_i32(errors: &mut FieldErrors, field: &'static str, value: i32, min: i32, max: i32) {
    if value < min || value > max {
        errors.add(field, format!("must be between {min} and {max}"));
    }
}

/// Business date between [`ANO_MINIMO`] and [`ANO_MAXIMO`].
pub fn data(errors: &mut FieldErrors, field: &'static str, value: NaiveDate) {
    if !(ANO_MINIMO..=ANO_MAXIMO).contains(&value.year()) {
        errors.add(
            field,
            format!("must be a date between the years {ANO_MINIMO} and {ANO_MAXIMO}"),
        );
    }
}

/// Loose e-mail shape check: one `@`, non-empty local part, dotted domain.
pub fn email(errors: &mut FieldErrors, field: &'static str, value: &str) {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        errors.add(field, "must be a valid e-mail address");
    }
}

/// Brazilian state abbreviation: two ASCII letters.
pub fn uf(errors: &mut FieldErrors, field: &'static str, value: &str) {
    if value.len() != 2 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
        errors.add(field, "must be a two-letter state code");
    }
}

pub fn latitude(errors: &mut FieldErrors, value: Option<f64>) {
    if let Some(lat) = value {
        if !(-90.0..=90.0).contains(&lat) {
            errors.add("latitude", "must be between -90 and 90");
        }
    }
}

pub fn longitude(errors: &mut FieldErrors, value: Option<f64>) {
    if let Some(lng) = value {
        if !(-180.0..=180.0).contains(&lng) {
            errors.add("longitude", "must be between -180 and 180");
        }
    }
}

/// `#RRGGBB` colour.
pub fn hex_color(errors: &mut FieldErrors, field: &'static str, value: &str) {
    let valid = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        errors.add(field, "must be a #RRGGBB colour");
    }
}

/// CPF (11 digits) or CNPJ (14 digits), check digits included.
pub fn documento(errors: &mut FieldErrors, field: &'static str, digits: &str) {
    match digits.len() {
        11 if is_valid_cpf(digits) => {}
        11 => errors.add(field, "invalid CPF"),
        14 if is_valid_cnpj(digits) => {}
        14 => errors.add(field, "invalid CNPJ"),
        _ => errors.add(field, "must be a CPF (11 digits) or CNPJ (14 digits)"),
    }
}

fn digit_values(digits: &str) -> Option<Vec<u32>> {
    digits.chars().map(|c| c.to_digit(10)).collect()
}

fn all_same(values: &[u32]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

pub fn is_valid_cpf(digits: &str) -> bool {
    let Some(d) = digit_values(digits) else {
        return false;
    };
    if d.len() != 11 || all_same(&d) {
        return false;
    }

    let check = |len: usize| {
        let sum: u32 = d[..len]
            .iter()
            .enumerate()
            .map(|(i, v)| v * (len as u32 + 1 - i as u32))
            .sum();
        let rest = (sum * 10) % 11;
        if rest == 10 { 0 } else { rest }
    };

    check(9) == d[9] && check(10) == d[10]
}

pub fn is_valid_cnpj(digits: &str) -> bool {
    const FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    let Some(d) = digit_values(digits) else {
        return false;
    };
    if d.len() != 14 || all_same(&d) {
        return false;
    }

    let check = |weights: &[u32]| {
        let sum: u32 = weights.iter().zip(&d).map(|(w, v)| w * v).sum();
        let rest = sum % 11;
        if rest < 2 { 0 } else { 11 - rest }
    };

    check(&FIRST) == d[12] && check(&SECOND) == d[13]
}

/// Show only the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_digits_strips_punctuation() {
        assert_eq!(only_digits("11.222.333/0001-81"), "11222333000181");
    }

    #[test]
    fn cpf_check_digits() {
        assert!(is_valid_cpf("52998224725"));
        assert!(!is_valid_cpf("52998224726"));
        assert!(!is_valid_cpf("11111111111"));
        assert!(!is_valid_cpf("5299822472"));
    }

    #[test]
    fn cnpj_check_digits() {
        assert!(is_valid_cnpj("11222333000181"));
        assert!(!is_valid_cnpj("11222333000182"));
        assert!(!is_valid_cnpj("00000000000000"));
    }

    #[test]
    fn documento_reports_kind() {
        let mut errors = FieldErrors::new();
        documento(&mut errors, "documento", "123");
        assert_eq!(
            errors.get("documento"),
            Some("must be a CPF (11 digits) or CNPJ (14 digits)")
        );

        let mut errors = FieldErrors::new();
        documento(&mut errors, "documento", "11222333000199");
        assert_eq!(errors.get("documento"), Some("invalid CNPJ"));
    }

    #[test]
    fn email_shapes() {
        let check = |value: &str| {
            let mut errors = FieldErrors::new();
            email(&mut errors, "email", value);
            errors.is_empty()
        };
        assert!(check("compras@fazenda.com.br"));
        assert!(!check("compras@fazenda"));
        assert!(!check("@fazenda.com"));
        assert!(!check("a@b@c.com"));
        assert!(!check("sem arroba.com"));
    }

    #[test]
    fn hex_colors() {
        let check = |value: &str| {
            let mut errors = FieldErrors::new();
            hex_color(&mut errors, "cor_hex", value);
            errors.is_empty()
        };
        assert!(check("#1A2b3C"));
        assert!(!check("1A2B3C"));
        assert!(!check("#1A2B3G"));
    }

    #[test]
    fn digit_ranges() {
        let mut errors = FieldErrors::new();
        digits(&mut errors, "banco_codigo", "01", 3, 3);
        assert_eq!(errors.get("banco_codigo"), Some("must be exactly 3 digits"));

        let mut errors = FieldErrors::new();
        digits(&mut errors, "agencia", "12a4", 1, 5);
        assert_eq!(errors.get("agencia"), Some("must be 1 to 5 digits"));
    }

    #[test]
    fn secrets_are_masked() {
        assert_eq!(mask_secret("abcdefgh"), "****efgh");
        assert_eq!(mask_secret("abc"), "***");
    }

    #[test]
    fn dates_outside_supported_years_are_rejected() {
        let mut errors = FieldErrors::new();
        data(&mut errors, "antiga", NaiveDate::from_ymd_opt(-4800, 1, 1).unwrap());
        data(&mut errors, "minima", NaiveDate::from_ymd_opt(ANO_MINIMO, 1, 1).unwrap());
        data(&mut errors, "futura", NaiveDate::MAX);
        assert!(errors.get("antiga").is_some());
        assert!(errors.get("minima").is_none());
        assert!(errors.get("futura").is_some());
    }
}
