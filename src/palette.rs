// Categorical color palettes with stable key-to-color assignment

use std::collections::HashMap;

/// Color palette for categorical data
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<String>,
}

impl ColorPalette {
    /// Category10 palette (D3-inspired), as hex strings
    pub fn category10() -> Self {
        ColorPalette {
            colors: [
                "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
                "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Get color for a specific index (wraps around if index > palette size)
    pub fn get_color(&self, index: usize) -> String {
        self.colors[index % self.colors.len()].clone()
    }
}

/// Assigns palette slots to series keys and keeps them across re-renders.
///
/// A key that persists between calls keeps its slot. Keys that disappear
/// release theirs, and new keys take the lowest free slot in first-seen
/// order. Once every slot is taken, further keys wrap around the palette.
#[derive(Debug, Clone)]
pub struct ColorAssigner {
    palette: ColorPalette,
    slots: HashMap<String, usize>,
}

impl ColorAssigner {
    pub fn new(palette: ColorPalette) -> Self {
        ColorAssigner {
            palette,
            slots: HashMap::new(),
        }
    }

    /// Update assignments for the current key set (in first-seen order).
    /// Returns `true` when any key's color changed or was added or removed.
    pub fn assign(&mut self, keys: &[String]) -> bool {
        let before = self.slots.len();
        self.slots.retain(|key, _| keys.contains(key));
        let mut changed = self.slots.len() != before;

        let mut next_free = 0;
        for key in keys {
            if self.slots.contains_key(key) {
                continue;
            }
            let slot = if self.slots.len() < self.palette.len() {
                while self.slots.values().any(|&s| s == next_free) {
                    next_free += 1;
                }
                next_free
            } else {
                self.slots.len()
            };
            self.slots.insert(key.clone(), slot);
            changed = true;
        }
        changed
    }

    pub fn color(&self, key: &str) -> Option<String> {
        self.slots.get(key).map(|&slot| self.palette.get_color(slot))
    }

    /// Current key-to-color map.
    pub fn colors(&self) -> HashMap<String, String> {
        self.slots
            .iter()
            .map(|(key, &slot)| (key.clone(), self.palette.get_color(slot)))
            .collect()
    }
}

impl Default for ColorAssigner {
    fn default() -> Self {
        ColorAssigner::new(ColorPalette::category10())
    }
}

/// Parse `#rrggbb` into components.
pub fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
