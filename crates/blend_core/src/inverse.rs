//! Inverse target mapping: property-level targets → sparse attribute targets.
//!
//! The mapping is heuristic and not a bijection. Properties are applied in a
//! fixed priority order and later steps read back what earlier steps already
//! assigned so shared attributes are not counted twice.

use crate::{Attribute, AttributeTarget, Property, PropertyTarget};

/// Lauric/myristic split for the degreasing acids.
const DEGREASING_SPLIT: (f64, f64) = (0.7, 0.3);
/// Portion of lather volume given to the degreasing acids when degreasing
/// itself was not specified.
const LATHER_DEGREASING_PORTION: f64 = 0.8;
/// Palmitic/stearic split for hardness and creaminess remainders.
const SATURATED_SPLIT: (f64, f64) = (0.6, 0.4);
/// Oleic/linoleic/linolenic split for moisturizing.
const MOISTURIZING_SPLIT: (f64, f64, f64) = (0.75, 0.2, 0.05);

/// Hardness and moisturizing together cover nearly every acid.
const PAIR_TOTAL: f64 = 100.0;
const PAIR_TOLERANCE: f64 = 15.0;

pub fn map_properties_to_attributes(targets: &PropertyTarget) -> AttributeTarget {
    let mut mapped = AttributeTarget::new();
    let assigned = |mapped: &AttributeTarget, attribute: Attribute| {
        mapped.get(&attribute).copied().unwrap_or(0.0)
    };

    if let Some(&degreasing) = targets.get(&Property::Degreasing) {
        mapped.insert(Attribute::Lauric, degreasing * DEGREASING_SPLIT.0);
        mapped.insert(Attribute::Myristic, degreasing * DEGREASING_SPLIT.1);
    }

    if let Some(&volume) = targets.get(&Property::LatherVolume) {
        if !mapped.contains_key(&Attribute::Lauric) && !mapped.contains_key(&Attribute::Myristic) {
            let portion = volume * LATHER_DEGREASING_PORTION;
            mapped.insert(Attribute::Lauric, portion * DEGREASING_SPLIT.0);
            mapped.insert(Attribute::Myristic, portion * DEGREASING_SPLIT.1);
        }
        let degreasing =
            assigned(&mapped, Attribute::Lauric) + assigned(&mapped, Attribute::Myristic);
        mapped.insert(Attribute::Ricinoleic, (volume - degreasing).max(0.0));
    }

    if let Some(&hardness) = targets.get(&Property::Hardness) {
        let degreasing =
            assigned(&mapped, Attribute::Lauric) + assigned(&mapped, Attribute::Myristic);
        let remainder = (hardness - degreasing).max(0.0);
        mapped.insert(Attribute::Palmitic, remainder * SATURATED_SPLIT.0);
        mapped.insert(Attribute::Stearic, remainder * SATURATED_SPLIT.1);
    }

    if let Some(&creaminess) = targets.get(&Property::Creaminess) {
        let covered = assigned(&mapped, Attribute::Palmitic)
            + assigned(&mapped, Attribute::Stearic)
            + assigned(&mapped, Attribute::Ricinoleic);
        let remainder = (creaminess - covered).max(0.0);
        let palmitic = assigned(&mapped, Attribute::Palmitic) + remainder * SATURATED_SPLIT.0;
        let stearic = assigned(&mapped, Attribute::Stearic) + remainder * SATURATED_SPLIT.1;
        mapped.insert(Attribute::Palmitic, palmitic);
        mapped.insert(Attribute::Stearic, stearic);
    }

    if let Some(&moisturizing) = targets.get(&Property::Moisturizing) {
        let remainder = (moisturizing - assigned(&mapped, Attribute::Ricinoleic)).max(0.0);
        mapped.insert(Attribute::Oleic, remainder * MOISTURIZING_SPLIT.0);
        mapped.insert(Attribute::Linoleic, remainder * MOISTURIZING_SPLIT.1);
        mapped.insert(Attribute::Linolenic, remainder * MOISTURIZING_SPLIT.2);
    }

    mapped
}

/// Explains the first cross-property inconsistency, or `None` when the
/// targets can plausibly be met together.
pub fn validate_property_targets(targets: &PropertyTarget) -> Option<String> {
    for (property, value) in targets {
        if !value.is_finite() || !(0.0..=100.0).contains(value) {
            return Some(format!("{property} must be between 0 and 100, got {value}"));
        }
    }

    let get = |property: Property| targets.get(&property).copied();

    if let (Some(hardness), Some(moisturizing)) =
        (get(Property::Hardness), get(Property::Moisturizing))
    {
        let sum = hardness + moisturizing;
        if (sum - PAIR_TOTAL).abs() > PAIR_TOLERANCE {
            return Some(format!(
                "hardness ({hardness}) and moisturizing ({moisturizing}) should add up to about \
                 {PAIR_TOTAL} (±{PAIR_TOLERANCE}), got {sum}"
            ));
        }
    }

    if let (Some(degreasing), Some(hardness)) =
        (get(Property::Degreasing), get(Property::Hardness))
    {
        if degreasing > hardness {
            return Some(format!(
                "degreasing ({degreasing}) cannot exceed hardness ({hardness}); \
                 the degreasing acids are part of hardness"
            ));
        }
    }

    if let (Some(volume), Some(degreasing)) =
        (get(Property::LatherVolume), get(Property::Degreasing))
    {
        if volume < degreasing {
            return Some(format!(
                "lather_volume ({volume}) must be at least degreasing ({degreasing}); \
                 the degreasing acids also produce lather"
            ));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::derive_properties;
    use crate::AttributeVector;

    fn targets(pairs: &[(Property, f64)]) -> PropertyTarget {
        pairs.iter().copied().collect()
    }

    fn value(mapped: &AttributeTarget, attribute: Attribute) -> f64 {
        mapped.get(&attribute).copied().unwrap_or(f64::NAN)
    }

    #[test]
    fn degreasing_splits_70_30() {
        let mapped = map_properties_to_attributes(&targets(&[(Property::Degreasing, 20.0)]));
        assert_eq!(mapped.len(), 2);
        assert!((value(&mapped, Attribute::Lauric) - 14.0).abs() < 1e-9);
        assert!((value(&mapped, Attribute::Myristic) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn hardness_fills_remainder_after_degreasing() {
        let mapped = map_properties_to_attributes(&targets(&[
            (Property::Degreasing, 20.0),
            (Property::Hardness, 45.0),
        ]));
        assert!((value(&mapped, Attribute::Palmitic) - 15.0).abs() < 1e-9);
        assert!((value(&mapped, Attribute::Stearic) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn lather_volume_tops_up_ricinoleic() {
        let mapped = map_properties_to_attributes(&targets(&[
            (Property::Degreasing, 15.0),
            (Property::LatherVolume, 20.0),
        ]));
        assert!((value(&mapped, Attribute::Ricinoleic) - 5.0).abs() < 1e-9);

        let alone = map_properties_to_attributes(&targets(&[(Property::LatherVolume, 20.0)]));
        assert!((value(&alone, Attribute::Lauric) - 11.2).abs() < 1e-9);
        assert!((value(&alone, Attribute::Myristic) - 4.8).abs() < 1e-9);
        assert!((value(&alone, Attribute::Ricinoleic) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn moisturizing_discounts_ricinoleic() {
        let mapped = map_properties_to_attributes(&targets(&[
            (Property::Degreasing, 10.0),
            (Property::LatherVolume, 14.0),
            (Property::Moisturizing, 60.0),
        ]));
        // ricinoleic = 4, remainder 56
        assert!((value(&mapped, Attribute::Oleic) - 42.0).abs() < 1e-9);
        assert!((value(&mapped, Attribute::Linoleic) - 11.2).abs() < 1e-9);
        assert!((value(&mapped, Attribute::Linolenic) - 2.8).abs() < 1e-9);
    }

    #[test]
    fn unspecified_properties_leave_attributes_unconstrained() {
        let mapped = map_properties_to_attributes(&targets(&[(Property::Moisturizing, 50.0)]));
        assert!(!mapped.contains_key(&Attribute::Lauric));
        assert!(!mapped.contains_key(&Attribute::Palmitic));
        assert!(map_properties_to_attributes(&PropertyTarget::new()).is_empty());
    }

    #[test]
    fn mapped_targets_reproduce_property_values() {
        let wanted = targets(&[
            (Property::Degreasing, 16.0),
            (Property::Hardness, 40.0),
            (Property::LatherVolume, 20.0),
            (Property::Moisturizing, 55.0),
        ]);
        let mapped = map_properties_to_attributes(&wanted);
        let mut attributes = AttributeVector::default();
        for (attribute, value) in &mapped {
            attributes[*attribute] = *value;
        }
        let derived = derive_properties(&attributes);
        assert!((derived.degreasing - 16.0).abs() < 1e-9);
        assert!((derived.hardness - 40.0).abs() < 1e-9);
        assert!((derived.lather_volume - 20.0).abs() < 1e-9);
        assert!((derived.moisturizing - 55.0).abs() < 1e-9);
    }

    #[test]
    fn hardness_moisturizing_band_is_inclusive() {
        assert_eq!(
            validate_property_targets(&targets(&[
                (Property::Hardness, 80.0),
                (Property::Moisturizing, 10.0),
            ])),
            None
        );
        assert_eq!(
            validate_property_targets(&targets(&[
                (Property::Hardness, 80.0),
                (Property::Moisturizing, 5.0),
            ])),
            None
        );
        assert!(validate_property_targets(&targets(&[
            (Property::Hardness, 80.0),
            (Property::Moisturizing, 4.0),
        ]))
        .is_some());
        assert!(validate_property_targets(&targets(&[
            (Property::Hardness, 70.0),
            (Property::Moisturizing, 50.0),
        ]))
        .is_some());
    }

    #[test]
    fn subset_cannot_exceed_superset() {
        let message = validate_property_targets(&targets(&[
            (Property::Degreasing, 30.0),
            (Property::Hardness, 25.0),
        ]))
        .unwrap();
        assert!(message.contains("degreasing"));
    }

    #[test]
    fn volume_must_cover_degreasing() {
        let message = validate_property_targets(&targets(&[
            (Property::Degreasing, 20.0),
            (Property::LatherVolume, 10.0),
        ]))
        .unwrap();
        assert!(message.contains("lather_volume"));
    }

    #[test]
    fn out_of_scale_values_are_reported_first() {
        let message = validate_property_targets(&targets(&[
            (Property::Hardness, 140.0),
            (Property::Degreasing, 150.0),
        ]))
        .unwrap();
        assert!(message.contains("between 0 and 100"));
        assert_eq!(validate_property_targets(&PropertyTarget::new()), None);
    }
}
