//! Column-name-keyed schema union
//!
//! - Same name, same type: merged into one column
//! - Same name, different type: `SchemaUnionError`
//! - Columns unique to either side: kept, in first-seen order

use super::types::Schema;
use crate::errors::{LoaderError, LoaderResult};

impl Schema {
    /// Merges `other` into this schema in place.
    ///
    /// On error `self` is left unchanged.
    pub fn union_with(&mut self, other: &Schema) -> LoaderResult<()> {
        let mut additions = Vec::new();

        for column in other.columns() {
            match self.column_by_name(&column.name) {
                Some(existing) if existing.column_type == column.column_type => {}
                Some(existing) => {
                    return Err(LoaderError::schema_union(
                        &column.name,
                        &existing.column_type,
                        &column.column_type,
                    ));
                }
                None => additions.push(column.clone()),
            }
        }

        for column in additions {
            self.push(column)?;
        }
        Ok(())
    }
}

/// Unions schemas pairwise in iteration order
pub fn union_all<'a>(schemas: impl IntoIterator<Item = &'a Schema>) -> LoaderResult<Schema> {
    let mut result = Schema::empty();
    for schema in schemas {
        result.union_with(schema)?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LoaderErrorCode;

    fn schema(text: &str) -> Schema {
        text.parse().unwrap()
    }

    #[test]
    fn test_union_first_seen_order() {
        let merged = union_all([&schema("a:int, b:string"), &schema("c:long, a:int")]).unwrap();
        assert_eq!(merged.to_string(), "a:int, b:string, c:long");
    }

    #[test]
    fn test_conflicting_type_fails() {
        let err = union_all([&schema("a:int"), &schema("a:string")]).unwrap_err();
        assert_eq!(err.code(), LoaderErrorCode::SchemaUnionError);
        assert!(err.to_string().contains("'a'"));
    }

    #[test]
    fn test_failed_union_leaves_schema_unchanged() {
        let mut base = schema("a:int");
        assert!(base.union_with(&schema("z:int, a:bool")).is_err());
        assert_eq!(base.to_string(), "a:int");
    }

    #[test]
    fn test_union_is_associative() {
        let p1 = schema("a:int, m:map(string)");
        let p2 = schema("b:double, a:int");
        let p3 = schema("c:bytes, m:map(string)");

        let left = union_all([&union_all([&p1, &p2]).unwrap(), &p3]).unwrap();
        let right = union_all([&p1, &union_all([&p2, &p3]).unwrap()]).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn test_column_order_only_difference() {
        let merged = union_all([&schema("a:int, b:string"), &schema("b:string, a:int")]).unwrap();
        let mut names: Vec<_> = merged.names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_nested_types_must_match_exactly() {
        let err = union_all([&schema("r:record(x:int)"), &schema("r:record(x:long)")]).unwrap_err();
        assert_eq!(err.code(), LoaderErrorCode::SchemaUnionError);
    }
}
