//! Reescala linear de medições para canais de gauge de 8 bits.
//!
//! A saída é limitada apenas por cima: valores acima de `in_max` saturam
//! em `out_max`, mas entradas abaixo de `in_min` seguem a fórmula e podem
//! ficar negativas. A conversão para byte ([`gauge_byte`]) satura em 0.

use serde::{Deserialize, Serialize};

/// Menor valor de um canal de gauge.
pub const GAUGE_MIN: f64 = 0.0;
/// Maior valor de um canal de gauge.
pub const GAUGE_MAX: f64 = 255.0;

/// Como o valor reescalado vira inteiro.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rounding {
    /// Trunca a entrada e a saída em direção a zero (compatível com o
    /// firmware existente).
    #[default]
    Truncate,
    /// Arredonda a saída para o inteiro mais próximo (meio para longe de zero).
    Nearest,
}

impl Rounding {
    /// Prepara a medição antes da reescala.
    ///
    /// Em `Truncate` percentuais fracionários são descartados antes
    /// (50.9% conta como 50%).
    pub fn input(self, value: f64) -> f64 {
        match self {
            Rounding::Truncate => value.trunc(),
            Rounding::Nearest => value,
        }
    }

    /// Converte o valor reescalado em inteiro.
    pub fn output(self, value: f64) -> i64 {
        match self {
            Rounding::Truncate => value.trunc() as i64,
            Rounding::Nearest => value.round() as i64,
        }
    }
}

/// Faixa de entrada e saída de um canal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub in_min: f64,
    pub in_max: f64,
    pub out_min: f64,
    pub out_max: f64,
}

impl Scale {
    /// Canal de gauge padrão: `0..=in_max` → `0..=255`.
    pub const fn gauge(in_max: f64) -> Self {
        Self {
            in_min: 0.0,
            in_max,
            out_min: GAUGE_MIN,
            out_max: GAUGE_MAX,
        }
    }

    /// Percentual 0–100 → 0–255.
    pub const fn percent() -> Self {
        Self::gauge(100.0)
    }

    /// Aplica a reescala com saturação superior.
    pub fn apply(&self, value: f64, rounding: Rounding) -> i64 {
        let scaled = (value - self.in_min) * (self.out_max - self.out_min)
            / (self.in_max - self.in_min)
            + self.out_min;
        let scaled = if scaled > self.out_max {
            self.out_max
        } else {
            scaled
        };
        rounding.output(scaled)
    }
}

/// Reescala `value` de `in_min..in_max` para `0..255`, truncando.
pub fn normalize(value: f64, in_min: f64, in_max: f64) -> i64 {
    normalize_to(value, in_min, in_max, GAUGE_MIN, GAUGE_MAX)
}

/// Reescala `value` de `in_min..in_max` para `out_min..out_max`, truncando.
pub fn normalize_to(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> i64 {
    Scale {
        in_min,
        in_max,
        out_min,
        out_max,
    }
    .apply(value, Rounding::Truncate)
}

/// Converte um valor normalizado no byte do canal.
///
/// Valores negativos (ex: taxa negativa por reset de contador) saturam em 0
/// em vez de dar a volta.
pub fn gauge_byte(value: i64) -> u8 {
    value.clamp(0, u8::MAX as i64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_maps_to_out_max() {
        assert_eq!(normalize(100.0, 0.0, 100.0), 255);
        assert_eq!(normalize(1000.0, 0.0, 1000.0), 255);
        assert_eq!(normalize(0.0, 0.0, 100.0), 0);
    }

    #[test]
    fn truncates_toward_zero() {
        // 50 * 255 / 100 = 127.5
        assert_eq!(normalize(50.0, 0.0, 100.0), 127);
        // 250 * 255 / 1000 = 63.75
        assert_eq!(normalize(250.0, 0.0, 1000.0), 63);
    }

    #[test]
    fn nearest_rounds_half_away_from_zero() {
        let s = Scale::percent();
        assert_eq!(s.apply(50.0, Rounding::Nearest), 128);
        assert_eq!(s.apply(25.0, Rounding::Nearest), 64);
        assert_eq!(s.apply(10.0, Rounding::Nearest), 26);
    }

    #[test]
    fn clamps_above_range() {
        for value in [100.1, 150.0, 1e6, f64::INFINITY] {
            assert_eq!(normalize(value, 0.0, 100.0), 255, "value {value}");
        }
        assert_eq!(normalize(5000.0, 0.0, 1000.0), 255);
    }

    #[test]
    fn no_lower_clamp() {
        assert_eq!(normalize(-10.0, 0.0, 100.0), -25);
        assert_eq!(normalize(-1000.0, 0.0, 1000.0), -255);
    }

    #[test]
    fn monotonic_in_value() {
        let mut previous = i64::MIN;
        let mut v = -50.0;
        while v <= 200.0 {
            let out = normalize(v, 0.0, 100.0);
            assert!(out >= previous, "normalize({v}) = {out} < {previous}");
            previous = out;
            v += 0.37;
        }
    }

    #[test]
    fn custom_output_range() {
        assert_eq!(normalize_to(5.0, 0.0, 10.0, 100.0, 200.0), 150);
        assert_eq!(normalize_to(20.0, 0.0, 10.0, 100.0, 200.0), 200);
    }

    #[test]
    fn truncate_input_drops_fraction() {
        assert_eq!(Rounding::Truncate.input(50.9), 50.0);
        assert_eq!(Rounding::Nearest.input(50.9), 50.9);
    }

    #[test]
    fn gauge_byte_saturates_both_ends() {
        assert_eq!(gauge_byte(-25), 0);
        assert_eq!(gauge_byte(0), 0);
        assert_eq!(gauge_byte(200), 200);
        assert_eq!(gauge_byte(255), 255);
        assert_eq!(gauge_byte(300), 255);
    }
}
