//! Parsing for the `key=value,key=value` and `a,b,c` argument forms.

use anyhow::{bail, Context, Result};
use blend_core::{
    Attribute, AttributeTarget, Exclusions, IngredientDatabase, IngredientFlag, IngredientId,
    Property, PropertyTarget, Share,
};

pub fn parse_pairs(input: &str) -> Result<Vec<(String, f64)>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (key, value) = item
                .split_once('=')
                .with_context(|| format!("expected key=value, got '{item}'"))?;
            let value: f64 = value
                .trim()
                .parse()
                .with_context(|| format!("'{key}': '{value}' is not a number"))?;
            Ok((key.trim().to_string(), value))
        })
        .collect()
}

pub fn parse_attribute_target(input: &str) -> Result<AttributeTarget> {
    parse_pairs(input)?
        .into_iter()
        .map(|(key, value)| -> Result<(Attribute, f64)> { Ok((key.parse()?, value)) })
        .collect()
}

pub fn parse_property_target(input: &str) -> Result<PropertyTarget> {
    parse_pairs(input)?
        .into_iter()
        .map(|(key, value)| -> Result<(Property, f64)> { Ok((key.parse()?, value)) })
        .collect()
}

pub fn parse_ids(input: &str) -> Vec<IngredientId> {
    input
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(IngredientId::from)
        .collect()
}

/// `id=amount` pairs; every share gets the same hold.
pub fn parse_shares(input: &str, locked: bool) -> Result<Vec<Share>> {
    Ok(parse_pairs(input)?
        .into_iter()
        .map(|(id, amount)| {
            let id = IngredientId(id);
            if locked {
                Share::locked(id, amount)
            } else {
                Share::free(id, amount)
            }
        })
        .collect())
}

pub fn parse_exclusions(ids: Option<&str>, flags: &[String]) -> Result<Exclusions> {
    let mut exclusions = Exclusions::default();
    if let Some(ids) = ids {
        exclusions.ids.extend(parse_ids(ids));
    }
    for flag in flags {
        let parsed: IngredientFlag = serde_json::from_value(serde_json::Value::String(flag.clone()))
            .with_context(|| format!("unknown ingredient flag '{flag}'"))?;
        exclusions.flags.push(parsed);
    }
    Ok(exclusions)
}

/// Fails on the first id the database does not know.
pub fn ensure_known<'a>(
    ids: impl IntoIterator<Item = &'a IngredientId>,
    database: &IngredientDatabase,
) -> Result<()> {
    for id in ids {
        if !database.contains(id) {
            bail!("unknown ingredient '{id}'");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blend_core::test_fixtures::sample_database;

    #[test]
    fn test_pairs_tolerate_spaces_and_trailing_comma() {
        let pairs = parse_pairs(" oleic = 70, lauric=15 ,").unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "oleic");
        assert!((pairs[0].1 - 70.0).abs() < f64::EPSILON);
        assert_eq!(pairs[1].0, "lauric");
    }

    #[test]
    fn test_pair_without_equals_errors() {
        let err = parse_pairs("oleic").unwrap_err();
        assert!(err.to_string().contains("expected key=value"));
    }

    #[test]
    fn test_non_numeric_value_errors() {
        assert!(parse_pairs("oleic=lots").is_err());
    }

    #[test]
    fn test_attribute_target_rejects_unknown_keys() {
        let target = parse_attribute_target("oleic=70,ricinoleic=5").unwrap();
        assert_eq!(target.len(), 2);
        assert!(target.contains_key(&Attribute::Ricinoleic));
        assert!(parse_attribute_target("vaccenic=3").is_err());
    }

    #[test]
    fn test_property_target_parses_snake_case() {
        let target = parse_property_target("lather_volume=20,hardness=40").unwrap();
        assert!((target[&Property::LatherVolume] - 20.0).abs() < f64::EPSILON);
        assert!((target[&Property::Hardness] - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shares_carry_hold() {
        let shares = parse_shares("castor_oil=10", true).unwrap();
        assert!(shares[0].is_locked());
        assert_eq!(shares[0].ingredient, IngredientId::from("castor_oil"));
        assert!(!parse_shares("olive_oil=400", false).unwrap()[0].is_locked());
    }

    #[test]
    fn test_exclusions_parse_ids_and_flags() {
        let exclusions =
            parse_exclusions(Some("lard,tallow"), &["palm_derived".to_string()]).unwrap();
        assert!(exclusions.ids.contains(&IngredientId::from("tallow")));
        assert_eq!(exclusions.flags, vec![IngredientFlag::PalmDerived]);
        assert!(parse_exclusions(None, &["vegan".to_string()]).is_err());
    }

    #[test]
    fn test_ensure_known_names_the_missing_id() {
        let database = sample_database();
        let ids = parse_ids("olive_oil,unicorn_tallow");
        let err = ensure_known(&ids, &database).unwrap_err();
        assert!(err.to_string().contains("unicorn_tallow"));
        assert!(ensure_known(&ids[..1], &database).is_ok());
    }
}
