use serde::Serialize;
use steward::fleet::group_by_scope;
use steward::gitlab::ProjectVariable;

use crate::commands::summary::OutputFormat;

/// One variable in the `list-envs` table.
#[derive(Debug, Clone, tabled::Tabled)]
struct VariableRow {
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Protected")]
    protected: bool,
    #[tabled(rename = "Masked")]
    masked: bool,
}

/// Variables of one environment scope, as emitted by `--output json`.
#[derive(Debug, Serialize)]
struct ScopeListing<'a> {
    scope: &'a str,
    variables: Vec<&'a ProjectVariable>,
}

pub(crate) fn render_variables(
    project_id: u64,
    variables: &[ProjectVariable],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    let grouped = group_by_scope(variables);

    match format {
        OutputFormat::Json => {
            let listing: Vec<ScopeListing<'_>> = grouped
                .into_iter()
                .map(|(scope, variables)| ScopeListing { scope, variables })
                .collect();
            serde_json::to_string_pretty(&listing)
        }
        OutputFormat::Table => {
            if grouped.is_empty() {
                return Ok(format!("No variables on project #{project_id}"));
            }

            let rows: Vec<VariableRow> = grouped
                .values()
                .flatten()
                .map(|v| VariableRow {
                    scope: v.environment_scope.clone(),
                    key: v.key.clone(),
                    value: if v.masked {
                        "[masked]".to_string()
                    } else {
                        v.value.clone()
                    },
                    protected: v.protected,
                    masked: v.masked,
                })
                .collect();

            let mut table = tabled::Table::new(rows);
            table.with(tabled::settings::Style::rounded());
            Ok(format!(
                "Project #{}: {} variables in {} scopes\n{}",
                project_id,
                variables.len(),
                grouped.len(),
                table
            ))
        }
    }
}
