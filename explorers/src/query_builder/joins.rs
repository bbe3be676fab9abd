use std::collections::BTreeSet;

use crate::error::{ExploreError, Result};
use crate::explore::{CompiledJoin, Explore};

/// Close `required` over join conditions and row filters, then return the
/// explore's joins whose target is needed, in declaration order.
///
/// Declaration order is never changed: a join condition may only reference
/// tables that appear earlier in the FROM / JOIN chain.
pub(crate) fn select_required_joins<'a>(
    explore: &'a Explore,
    mut required: BTreeSet<String>,
) -> Result<Vec<&'a CompiledJoin>> {
    required.insert(explore.base_table().to_string());

    loop {
        let mut added = BTreeSet::new();
        for table in &required {
            if let Some(compiled) = explore.table(table) {
                added.extend(compiled.sql_where_references.iter().cloned());
            }
            if let Some(join) = explore.join_for(table) {
                added.extend(join.tables_references.iter().cloned());
            }
        }
        let before = required.len();
        required.extend(added);
        if required.len() == before {
            break;
        }
    }

    for table in &required {
        if table != explore.base_table() && explore.join_for(table).is_none() {
            return Err(ExploreError::MissingJoin {
                explore: explore.name().to_string(),
                table: table.clone(),
            });
        }
    }

    Ok(explore
        .joins()
        .iter()
        .filter(|join| required.contains(&join.table))
        .collect())
}
