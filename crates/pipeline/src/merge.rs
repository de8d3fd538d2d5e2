// Entity merging
//
// All emissions of one pass are folded into one field map per (key, year).
// Output follows key order, so the same input always merges to the same
// records.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::model::{
    EntityKey, Emission, MergedRecord, PartialField, Provenance, ReferenceDate,
};

pub struct EntityMerger {
    dataset: &'static str,
    groups: BTreeMap<(EntityKey, i32), Map<String, Value>>,
    emissions: usize,
}

impl EntityMerger {
    pub fn new(dataset: &'static str) -> Self {
        Self {
            dataset,
            groups: BTreeMap::new(),
            emissions: 0,
        }
    }

    /// Fold one emission in. `pass_year` applies unless the emission carries
    /// its own year.
    pub fn push(&mut self, emission: Emission, pass_year: i32) {
        let year = emission.year.unwrap_or(pass_year);
        let fields = self.groups.entry((emission.key, year)).or_default();
        self.emissions += 1;

        match emission.field {
            PartialField::Set(name, value) => {
                fields.insert(name.to_string(), value);
            }
            PartialField::Append(name, value) => match fields.get_mut(name) {
                Some(Value::Array(items)) => items.push(value),
                Some(previous) => {
                    log::debug!("field '{}' was a scalar, replacing with a list", name);
                    *previous = Value::Array(vec![value]);
                }
                None => {
                    fields.insert(name.to_string(), Value::Array(vec![value]));
                }
            },
        }
    }

    pub fn extend<I: IntoIterator<Item = Emission>>(&mut self, emissions: I, pass_year: i32) {
        for emission in emissions {
            self.push(emission, pass_year);
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn emissions(&self) -> usize {
        self.emissions
    }

    /// Consume the merger, one record per (key, year) in key order.
    pub fn finish(
        self,
        reference: ReferenceDate,
        locator: &str,
        member: Option<&str>,
    ) -> Vec<MergedRecord> {
        let reference_date = reference.iso();
        let provenance = Provenance {
            locator: locator.to_string(),
            reference_date: reference_date.clone(),
            member: member.map(str::to_string),
        };
        let dataset = self.dataset;

        self.groups
            .into_iter()
            .map(|((key, year), fields)| MergedRecord {
                entity: key.kind(),
                key,
                reference_year: year,
                reference_date: reference_date.clone(),
                dataset,
                fields,
                provenance: BTreeMap::from([(dataset, provenance.clone())]),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn school(brin: &str) -> EntityKey {
        EntityKey::School { brin: brin.into() }
    }

    fn reference() -> ReferenceDate {
        ReferenceDate(NaiveDate::from_ymd_opt(2012, 10, 1).unwrap())
    }

    #[test]
    fn scalars_overwrite_lists_append() {
        let mut merger = EntityMerger::new("vo_schools");
        merger.push(Emission::set(school("AB12"), "name", json!("Oud")), 2012);
        merger.push(Emission::append(school("AB12"), "items", json!(1)), 2012);
        merger.push(Emission::set(school("AB12"), "name", json!("Nieuw")), 2012);
        merger.push(Emission::append(school("AB12"), "items", json!(1)), 2012);

        let records = merger.finish(reference(), "http://duo.nl/a.csv", None);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields["name"], json!("Nieuw"));
        // Duplicates are kept
        assert_eq!(records[0].fields["items"], json!([1, 1]));
    }

    #[test]
    fn output_is_key_ordered_and_year_split() {
        let mut merger = EntityMerger::new("staff");
        merger.push(Emission::append(school("CD34"), "staff", json!(1)), 2012);
        merger.push(
            Emission::append(school("AB12"), "staff", json!(2)).in_year(2011),
            2012,
        );
        merger.push(Emission::append(school("AB12"), "staff", json!(3)), 2012);

        let records = merger.finish(reference(), "loc", Some("noord.csv"));
        let ids: Vec<_> = records
            .iter()
            .map(|r| (r.key.to_string(), r.reference_year))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("AB12".to_string(), 2011),
                ("AB12".to_string(), 2012),
                ("CD34".to_string(), 2012)
            ]
        );
        assert_eq!(records[0].reference_date, "2012-10-01");
        assert_eq!(
            records[2].provenance["staff"].member.as_deref(),
            Some("noord.csv")
        );
    }

    #[test]
    fn append_after_set_replaces_scalar() {
        let mut merger = EntityMerger::new("x");
        merger.push(Emission::set(school("AB12"), "f", json!("s")), 2012);
        merger.push(Emission::append(school("AB12"), "f", json!(1)), 2012);
        let records = merger.finish(reference(), "loc", None);
        assert_eq!(records[0].fields["f"], json!([1]));
    }
}
