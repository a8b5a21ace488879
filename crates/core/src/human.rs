use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    Plain,
    #[default]
    Compact,
    Bytes,
}

pub fn format_value(value: f64, format: ValueFormat) -> String {
    match format {
        ValueFormat::Plain => plain(value),
        ValueFormat::Compact => compact(value),
        ValueFormat::Bytes => bytesize::ByteSize::b(value.max(0.0).round() as u64).to_string(),
    }
}

fn plain(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn compact(value: f64) -> String {
    let mut n = value;
    let units = ["", "K", "M", "B", "T"];
    let mut u = 0;
    while n.abs() >= 1000.0 && u < units.len() - 1 {
        n /= 1000.0;
        u += 1;
    }
    if u == 0 {
        plain(n)
    } else {
        format!("{:.1}{}", n, units[u])
    }
}
