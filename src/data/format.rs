//! Turning raw metric samples into chart values and readout text.

use super::metric::Metric;

/// Upper bound for percentage metrics on a capped graph.
pub const CAP: f64 = 100.0;

/// A sample value normalized for one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedValue {
    /// Value appended to the chart.
    pub chart: f64,
    /// Readout text, e.g. `"42.0%"`.
    pub display: String,
}

/// Formats sample values for a graph with a fixed capping policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueFormatter {
    cap_values: bool,
}

impl ValueFormatter {
    pub fn new(cap_values: bool) -> Self {
        Self { cap_values }
    }

    pub fn caps_values(&self) -> bool {
        self.cap_values
    }

    /// Normalize one raw value.
    ///
    /// Values above [`CAP`] are clamped when capping is on; the readout always
    /// shows the chart value with one decimal.
    pub fn format(&self, metric: Metric, raw: f64) -> FormattedValue {
        let chart = if self.cap_values && raw > CAP { CAP } else { raw };
        let mut display = format_tenths(chart);
        if metric.is_percentage() {
            display.push('%');
        }
        FormattedValue { chart, display }
    }

    /// Readout for the sample age, e.g. `"(4s)"`.
    pub fn format_age(age: f64) -> String {
        format!("({}s)", age.round() as i64)
    }
}

/// One decimal place, with exact ties rounded away from zero.
///
/// `{:.1}` rounds exact ties to even (`12.25` -> `12.2`); readouts round them
/// up (`12.3`). Values that only look like ties in decimal, such as `0.15`,
/// are not exact ties and keep the standard rounding.
fn format_tenths(value: f64) -> String {
    let scaled = value * 10.0;
    let exact_product = value.mul_add(10.0, -scaled) == 0.0;
    if exact_product && scaled.fract().abs() == 0.5 {
        format!("{:.1}", scaled.round() / 10.0)
    } else {
        format!("{:.1}", value)
    }
}
