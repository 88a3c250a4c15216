use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::variant::{VariantInformation, VariantKey};

/// A reference sequence together with the canonical variants observed on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contig {
    pub name: String,
    pub sequence: Option<String>,
    #[serde(
        serialize_with = "serialize_variants",
        deserialize_with = "deserialize_variants",
        default
    )]
    variants: BTreeMap<VariantKey, VariantInformation>,
}

impl Contig {
    pub fn new(name: &str, sequence: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            sequence: sequence.map(|s| s.to_ascii_uppercase()),
            variants: BTreeMap::new(),
        }
    }

    /// Length of the reference sequence, 0 if it is not known.
    pub fn length(&self) -> usize {
        self.sequence.as_ref().map_or(0, String::len)
    }

    /// Reference bases between 1-based inclusive `start` and `end`.
    pub fn subsequence(&self, start: u32, end: u32) -> Option<&str> {
        let sequence = self.sequence.as_deref()?;
        if start == 0 || start > end || end as usize > sequence.len() {
            return None;
        }
        sequence.get(start as usize - 1..end as usize)
    }

    pub fn variant(&self, position: u32, alternative: &str) -> Option<&VariantInformation> {
        self.variants.get(&VariantKey::new(position, alternative))
    }

    pub fn variant_mut(
        &mut self,
        position: u32,
        alternative: &str,
    ) -> Option<&mut VariantInformation> {
        self.variants.get_mut(&VariantKey::new(position, alternative))
    }

    /// Get the entry at `key`, creating it with `create` if it does not exist.
    /// The flag is `true` when the entry was created by this call.
    pub fn get_or_create_variant(
        &mut self,
        key: VariantKey,
        create: impl FnOnce() -> VariantInformation,
    ) -> (&mut VariantInformation, bool) {
        let mut created = false;
        let entry = self.variants.entry(key).or_insert_with(|| {
            created = true;
            create()
        });
        (entry, created)
    }

    pub fn variants(&self) -> impl Iterator<Item = (&VariantKey, &VariantInformation)> {
        self.variants.iter()
    }

    pub fn variants_mut(&mut self) -> impl Iterator<Item = (&VariantKey, &mut VariantInformation)> {
        self.variants.iter_mut()
    }

    /// Variants whose position lies in the 1-based inclusive range.
    pub fn variants_in(
        &self,
        positions: RangeInclusive<u32>,
    ) -> impl Iterator<Item = (&VariantKey, &VariantInformation)> {
        let lower = VariantKey::new(*positions.start(), "");
        let upper = positions.end().saturating_add(1);
        self.variants
            .range(lower..)
            .take_while(move |(key, _)| key.position < upper || upper == u32::MAX)
    }

    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Drop every entry for which `keep` returns false.
    pub fn retain_variants(&mut self, keep: impl FnMut(&VariantKey, &mut VariantInformation) -> bool) {
        self.variants.retain(keep);
    }
}

#[derive(Serialize)]
struct VariantEntryRef<'a> {
    position: u32,
    alternative: &'a str,
    #[serde(flatten)]
    information: &'a VariantInformation,
}

#[derive(Deserialize)]
struct VariantEntry {
    position: u32,
    alternative: String,
    #[serde(flatten)]
    information: VariantInformation,
}

// JSON object keys must be strings, so the index is written as a list.
fn serialize_variants<S: Serializer>(
    variants: &BTreeMap<VariantKey, VariantInformation>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(variants.iter().map(|(key, information)| VariantEntryRef {
        position: key.position,
        alternative: &key.alternative,
        information,
    }))
}

fn deserialize_variants<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<VariantKey, VariantInformation>, D::Error> {
    let entries = Vec::<VariantEntry>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|e| (VariantKey::new(e.position, &e.alternative), e.information))
        .collect())
}
