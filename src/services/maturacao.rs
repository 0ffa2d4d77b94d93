//! Banana maturation calendar.
//!
//! A tagged bunch matures for 100 days after registration, is harvested in
//! days 100–115, must be harvested urgently in days 116–120 and is lost
//! afterwards.

use std::{fmt, str::FromStr};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DIAS_INICIO_COLHEITA: i64 = 100;
pub const DIAS_FIM_COLHEITA: i64 = 115;
pub const DIAS_LIMITE: i64 = 120;

/// Ripening stage of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusMaturacao {
    Maturacao,
    Colheita,
    Alerta,
    Vencido,
}

impl StatusMaturacao {
    pub const ALL: [StatusMaturacao; 4] = [
        StatusMaturacao::Maturacao,
        StatusMaturacao::Colheita,
        StatusMaturacao::Alerta,
        StatusMaturacao::Vencido,
    ];

    pub fn from_dias(dias: i64) -> Self {
        match dias {
            d if d < DIAS_INICIO_COLHEITA => StatusMaturacao::Maturacao,
            d if d <= DIAS_FIM_COLHEITA => StatusMaturacao::Colheita,
            d if d <= DIAS_LIMITE => StatusMaturacao::Alerta,
            _ => StatusMaturacao::Vencido,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusMaturacao::Maturacao => "maturacao",
            StatusMaturacao::Colheita => "colheita",
            StatusMaturacao::Alerta => "alerta",
            StatusMaturacao::Vencido => "vencido",
        }
    }
}

impl fmt::Display for StatusMaturacao {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusMaturacao {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusMaturacao::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown maturation status '{s}'"))
    }
}

/// Days between registration and the reference date, never negative.
pub fn dias_decorridos(data_registro: NaiveDate, referencia: NaiveDate) -> i64 {
    (referencia - data_registro).num_days().max(0)
}

/// Harvest window derived from a registration date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JanelaColheita {
    pub inicio_colheita: NaiveDate,
    pub fim_colheita: NaiveDate,
    pub data_limite: NaiveDate,
}

impl JanelaColheita {
    /// Saturates at `NaiveDate::MAX` for registrations at the end of the calendar.
    pub fn para(data_registro: NaiveDate) -> Self {
        let depois = |dias: i64| {
            data_registro
                .checked_add_signed(Duration::days(dias))
                .unwrap_or(NaiveDate::MAX)
        };
        Self {
            inicio_colheita: depois(DIAS_INICIO_COLHEITA),
            fim_colheita: depois(DIAS_FIM_COLHEITA),
            data_limite: depois(DIAS_LIMITE),
        }
    }

    /// Whether `[inicio_colheita, data_limite]` overlaps `[inicio, fim]`.
    pub fn sobrepoe(&self, inicio: NaiveDate, fim: NaiveDate) -> bool {
        self.inicio_colheita <= fim && self.data_limite >= inicio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn thresholds() {
        assert_eq!(StatusMaturacao::from_dias(0), StatusMaturacao::Maturacao);
        assert_eq!(StatusMaturacao::from_dias(99), StatusMaturacao::Maturacao);
        assert_eq!(StatusMaturacao::from_dias(100), StatusMaturacao::Colheita);
        assert_eq!(StatusMaturacao::from_dias(115), StatusMaturacao::Colheita);
        assert_eq!(StatusMaturacao::from_dias(116), StatusMaturacao::Alerta);
        assert_eq!(StatusMaturacao::from_dias(120), StatusMaturacao::Alerta);
        assert_eq!(StatusMaturacao::from_dias(121), StatusMaturacao::Vencido);
    }

    #[test]
    fn reference_before_registration_counts_as_zero() {
        assert_eq!(dias_decorridos(date(2025, 3, 10), date(2025, 3, 1)), 0);
        assert_eq!(dias_decorridos(date(2025, 1, 1), date(2025, 4, 11)), 100);
    }

    #[test]
    fn window_dates() {
        let janela = JanelaColheita::para(date(2025, 1, 1));
        assert_eq!(janela.inicio_colheita, date(2025, 4, 11));
        assert_eq!(janela.fim_colheita, date(2025, 4, 26));
        assert_eq!(janela.data_limite, date(2025, 5, 1));
    }

    #[test]
    fn window_saturates_at_calendar_end() {
        let janela = JanelaColheita::para(NaiveDate::MAX);
        assert_eq!(janela.inicio_colheita, NaiveDate::MAX);
        assert_eq!(janela.data_limite, NaiveDate::MAX);
    }

    #[test]
    fn window_overlap() {
        let janela = JanelaColheita::para(date(2025, 1, 1));
        assert!(janela.sobrepoe(date(2025, 4, 1), date(2025, 4, 11)));
        assert!(janela.sobrepoe(date(2025, 5, 1), date(2025, 5, 31)));
        assert!(!janela.sobrepoe(date(2025, 5, 2), date(2025, 5, 31)));
        assert!(!janela.sobrepoe(date(2025, 3, 1), date(2025, 4, 10)));
    }

    #[test]
    fn status_parses_from_wire_name() {
        assert_eq!("alerta".parse::<StatusMaturacao>(), Ok(StatusMaturacao::Alerta));
        assert!("madura".parse::<StatusMaturacao>().is_err());
    }
}
