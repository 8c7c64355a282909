use crate::types::LanguageDistribution;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const PALETTE: [&str; 10] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#AF19FF", "#FF1919", "#FF4519", "#FF7119",
    "#FF9D19", "#FFC919",
];

/// Number of languages shown in a chart.
pub const MAX_SLICES: usize = 5;

/// Memoized language → color assignment.
///
/// Owned by whoever renders charts; two caches built over the same palette
/// always agree because the assignment is a pure function of the name.
#[derive(Debug, Clone)]
pub struct ColorCache {
    palette: &'static [&'static str],
    assigned: HashMap<String, &'static str>,
}

impl Default for ColorCache {
    fn default() -> Self {
        Self::new(&PALETTE)
    }
}

impl ColorCache {
    pub fn new(palette: &'static [&'static str]) -> Self {
        Self {
            palette,
            assigned: HashMap::new(),
        }
    }

    pub fn color_for(&mut self, language: &str) -> &'static str {
        if let Some(color) = self.assigned.get(language) {
            return *color;
        }

        let index = (language_hash(language).unsigned_abs() % self.palette.len() as u64) as usize;
        let color = self.palette[index];
        self.assigned.insert(language.to_string(), color);
        color
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

// c + (hash << 5) - hash over UTF-16 code units. Only the shift is cut to
// 32 bits; the subtraction and addition are not, so the total can leave i32.
fn language_hash(language: &str) -> i64 {
    language.encode_utf16().fold(0i64, |hash, unit| {
        let shifted = (hash as i32).wrapping_shl(5) as i64;
        unit as i64 + (shifted - hash)
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageSlice {
    pub name: String,
    /// Fraction of all bytes in the repository, between 0 and 1.
    pub share: f64,
    pub color: String,
}

/// Top languages by share, largest first. An empty distribution has no chart.
pub fn language_chart(
    distribution: &LanguageDistribution,
    colors: &mut ColorCache,
) -> Option<Vec<LanguageSlice>> {
    let total: u64 = distribution.values().sum();
    if total == 0 {
        return None;
    }

    let mut shares: Vec<(&String, f64)> = distribution
        .iter()
        .map(|(name, bytes)| (name, *bytes as f64 / total as f64))
        .collect();
    shares.sort_by(|a, b| b.1.total_cmp(&a.1));
    shares.truncate(MAX_SLICES);

    Some(
        shares
            .into_iter()
            .map(|(name, share)| LanguageSlice {
                name: name.clone(),
                share,
                color: colors.color_for(name).to_string(),
            })
            .collect(),
    )
}
