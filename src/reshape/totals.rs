//! Renewable and fossil totals for fuel-type generation data.

use crate::reading::coerce::round_to;

pub const RENEWABLE_FUELS: [&str; 5] = ["hydro", "geothermal", "biogas", "wind", "solar"];
pub const FOSSIL_FUELS: [&str; 3] = ["oil", "coal", "gas"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationMix {
    pub renewable_gwh: f64,
    pub fossil_gwh: f64,
    pub renewable_percentage: f64,
    pub fossil_percentage: f64,
}

impl GenerationMix {
    /// Sums the fuel values returned by `fuel`, treating missing fuels as 0.
    ///
    /// Percentages are of `renewable + fossil`, rounded to 2 places; a zero
    /// denominator gives 0 for both.
    pub fn from_fuels(fuel: impl Fn(&str) -> Option<f64>) -> Self {
        let renewable_gwh: f64 = RENEWABLE_FUELS.iter().map(|f| fuel(f).unwrap_or(0.0)).sum();
        let fossil_gwh: f64 = FOSSIL_FUELS.iter().map(|f| fuel(f).unwrap_or(0.0)).sum();

        let total = renewable_gwh + fossil_gwh;
        let share = |part: f64| {
            if total == 0.0 {
                0.0
            } else {
                round_to(100.0 * part / total, 2)
            }
        };

        GenerationMix {
            renewable_gwh,
            fossil_gwh,
            renewable_percentage: share(renewable_gwh),
            fossil_percentage: share(fossil_gwh),
        }
    }

    pub fn total_gwh(&self) -> f64 {
        self.renewable_gwh + self.fossil_gwh
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_split_renewable_and_fossil() {
        let mix = GenerationMix::from_fuels(|fuel| match fuel {
            "hydro" => Some(600.0),
            "wind" => Some(150.0),
            "gas" => Some(200.0),
            "coal" => Some(50.0),
            _ => None,
        });

        assert_eq!(mix.renewable_gwh, 750.0);
        assert_eq!(mix.fossil_gwh, 250.0);
        assert_eq!(mix.total_gwh(), 1000.0);
        assert_eq!(mix.renewable_percentage, 75.0);
        assert_eq!(mix.fossil_percentage, 25.0);
    }

    #[test]
    fn should_give_zero_percentages_for_zero_generation() {
        let mix = GenerationMix::from_fuels(|_| Some(0.0));

        assert_eq!(mix.renewable_percentage, 0.0);
        assert_eq!(mix.fossil_percentage, 0.0);
        assert!(!mix.renewable_percentage.is_nan());
    }

    #[test]
    fn should_round_percentages() {
        let mix = GenerationMix::from_fuels(|fuel| match fuel {
            "hydro" => Some(1.0),
            "oil" => Some(2.0),
            _ => None,
        });

        assert_eq!(mix.renewable_percentage, 33.33);
        assert_eq!(mix.fossil_percentage, 66.67);
    }
}
