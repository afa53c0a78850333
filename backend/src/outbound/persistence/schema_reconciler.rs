//! Startup schema reconciliation for the `rsvps` table.
//!
//! Brings the live table to the current shape from any historical revision
//! without data loss: enumerate the desired schema, observe the live one
//! through the Postgres catalogs, compute the minimal ordered DDL diff, and
//! apply it in a single transaction. Re-running on a current table plans
//! zero steps. Any failure here is fatal to startup; the service never
//! runs against an unknown table shape.
//!
//! Step ordering is fixed: rename, then column drops, then column adds,
//! then constraint drops, then constraint adds. The rename must come first
//! so `coming` exists before anything else refers to it.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use postgres::{Client, NoTls, Transaction};
use tracing::{debug, info};

/// Table owned by the reconciler.
pub const RSVPS_TABLE: &str = "rsvps";

/// Conventional name of the composite natural-key constraint.
const NAME_EMAIL_CONSTRAINT: &str = "rsvps_name_email_key";

/// Legacy column renamed in place to preserve its data.
const LEGACY_ATTENDING: &str = "attending";

/// Legacy columns dropped outright; their data is superseded.
const LEGACY_DROP_COLUMNS: &[&str] = &["message"];

/// Columns that may be added to an existing table, with their ADD COLUMN
/// definitions. `id`, `name`, and `email` exist in every historical
/// revision and are only ever created via CREATE TABLE.
const ADDABLE_COLUMNS: &[(&str, &str)] = &[
    ("coming", "BOOLEAN DEFAULT true"),
    ("allergies", "VARCHAR(500)"),
    ("transport_assist", "BOOLEAN DEFAULT false"),
    ("created_at", "TIMESTAMPTZ DEFAULT now()"),
];

const CREATE_TABLE_SQL: &str = "\
CREATE TABLE rsvps (
    id               SERIAL PRIMARY KEY,
    name             VARCHAR(255) NOT NULL,
    email            VARCHAR(255) NOT NULL,
    coming           BOOLEAN DEFAULT true,
    allergies        VARCHAR(500),
    transport_assist BOOLEAN DEFAULT false,
    created_at       TIMESTAMPTZ DEFAULT now(),
    CONSTRAINT rsvps_name_email_key UNIQUE (name, email)
)";

/// Errors raised during schema reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The database could not be reached within the connect timeout.
    #[error("schema reconciliation connection failed: {message}")]
    Connection { message: String },

    /// A catalog query failed while observing the live schema.
    #[error("schema introspection failed: {message}")]
    Introspection { message: String },

    /// A DDL statement failed; the transaction was rolled back.
    #[error("schema DDL failed at `{statement}`: {message}")]
    Ddl { statement: String, message: String },
}

impl ReconcileError {
    fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    fn introspection(message: impl Into<String>) -> Self {
        Self::Introspection {
            message: message.into(),
        }
    }

    fn ddl(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ddl {
            statement: statement.into(),
            message: message.into(),
        }
    }
}

/// A unique constraint observed on the live table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    /// Constraint name as recorded in `pg_constraint`.
    pub name: String,
    /// Constrained columns in key order.
    pub columns: Vec<String>,
}

/// Live shape of the `rsvps` table as read from the catalogs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedSchema {
    /// Whether the table exists at all.
    pub table_exists: bool,
    /// Observed column names.
    pub columns: BTreeSet<String>,
    /// Observed unique constraints, ordered by name.
    pub unique_constraints: Vec<UniqueConstraint>,
}

/// One DDL operation in the reconciliation plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlStep {
    /// Create the table with the full current shape and constraint.
    CreateTable,
    /// Rename a legacy column in place, preserving its data.
    RenameColumn {
        from: &'static str,
        to: &'static str,
    },
    /// Drop a superseded legacy column; its data is not preserved.
    DropColumn { name: String },
    /// Add a missing column with its default.
    AddColumn {
        name: &'static str,
        definition: &'static str,
    },
    /// Drop an obsolete uniqueness constraint.
    DropConstraint { name: String },
    /// Add the composite natural-key constraint.
    AddNaturalKeyConstraint,
}

impl DdlStep {
    /// Render the step as executable DDL.
    pub fn statement(&self) -> String {
        match self {
            Self::CreateTable => CREATE_TABLE_SQL.to_owned(),
            Self::RenameColumn { from, to } => {
                format!("ALTER TABLE {RSVPS_TABLE} RENAME COLUMN {from} TO {to}")
            }
            Self::DropColumn { name } => {
                format!("ALTER TABLE {RSVPS_TABLE} DROP COLUMN {name}")
            }
            Self::AddColumn { name, definition } => {
                format!("ALTER TABLE {RSVPS_TABLE} ADD COLUMN {name} {definition}")
            }
            Self::DropConstraint { name } => {
                format!("ALTER TABLE {RSVPS_TABLE} DROP CONSTRAINT {name}")
            }
            Self::AddNaturalKeyConstraint => format!(
                "ALTER TABLE {RSVPS_TABLE} ADD CONSTRAINT {NAME_EMAIL_CONSTRAINT} \
                 UNIQUE (name, email)"
            ),
        }
    }
}

/// Compute the minimal ordered DDL plan from an observed schema.
///
/// Pure function: the same observation always yields the same plan, and a
/// current table yields an empty one.
pub fn plan(observed: &ObservedSchema) -> Vec<DdlStep> {
    if !observed.table_exists {
        return vec![DdlStep::CreateTable];
    }

    let mut steps = Vec::new();
    let mut columns = observed.columns.clone();

    // Renames come first so later passes see the current column names.
    if columns.contains(LEGACY_ATTENDING) && !columns.contains("coming") {
        steps.push(DdlStep::RenameColumn {
            from: LEGACY_ATTENDING,
            to: "coming",
        });
        columns.remove(LEGACY_ATTENDING);
        columns.insert("coming".to_owned());
    }

    for &legacy in LEGACY_DROP_COLUMNS {
        if columns.remove(legacy) {
            steps.push(DdlStep::DropColumn {
                name: legacy.to_owned(),
            });
        }
    }

    for &(name, definition) in ADDABLE_COLUMNS {
        if !columns.contains(name) {
            steps.push(DdlStep::AddColumn { name, definition });
        }
    }

    let natural_key_present = observed
        .unique_constraints
        .iter()
        .any(|constraint| constraint.columns == ["name", "email"]);

    for constraint in &observed.unique_constraints {
        // The email-only key is the superseded deduplication rule; any
        // other constraint is left untouched.
        if constraint.columns == ["email"] {
            steps.push(DdlStep::DropConstraint {
                name: constraint.name.clone(),
            });
        }
    }

    if !natural_key_present {
        steps.push(DdlStep::AddNaturalKeyConstraint);
    }

    steps
}

/// Reconciles the live `rsvps` schema with the current shape at startup.
pub struct SchemaReconciler {
    database_url: String,
    connect_timeout: Duration,
}

impl SchemaReconciler {
    /// Construct a reconciler from a connection URL and connect timeout.
    pub fn new(database_url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            database_url: database_url.into(),
            connect_timeout,
        }
    }

    /// Observe, plan, and apply in one transaction.
    ///
    /// Returns the number of DDL steps applied (zero on a current table).
    ///
    /// # Errors
    /// Any connection, introspection, or DDL failure aborts the transaction
    /// and is returned; callers treat this as fatal to startup.
    pub fn run(&self) -> Result<usize, ReconcileError> {
        let mut client = self.connect()?;
        let mut tx = client
            .transaction()
            .map_err(|err| ReconcileError::connection(err.to_string()))?;

        let observed = observe(&mut tx)?;
        let steps = plan(&observed);
        if steps.is_empty() {
            debug!(table = RSVPS_TABLE, "schema already current");
        }
        for step in &steps {
            let statement = step.statement();
            info!(%statement, "applying schema change");
            tx.batch_execute(&statement)
                .map_err(|err| ReconcileError::ddl(statement, err.to_string()))?;
        }

        tx.commit()
            .map_err(|err| ReconcileError::ddl("COMMIT", err.to_string()))?;
        Ok(steps.len())
    }

    fn connect(&self) -> Result<Client, ReconcileError> {
        let mut config = postgres::Config::from_str(&self.database_url)
            .map_err(|err| ReconcileError::connection(err.to_string()))?;
        config.connect_timeout(self.connect_timeout);
        config
            .connect(NoTls)
            .map_err(|err| ReconcileError::connection(err.to_string()))
    }
}

/// Read the live table shape from the Postgres catalogs.
fn observe(tx: &mut Transaction<'_>) -> Result<ObservedSchema, ReconcileError> {
    let exists_query = concat!(
        "SELECT EXISTS (",
        "  SELECT 1 ",
        "  FROM pg_catalog.pg_class cls ",
        "  JOIN pg_catalog.pg_namespace ns ON ns.oid = cls.relnamespace ",
        "  WHERE ns.nspname = 'public' ",
        "    AND cls.relname = $1 ",
        "    AND cls.relkind IN ('r', 'p')",
        ")"
    );
    let row = tx
        .query_one(exists_query, &[&RSVPS_TABLE])
        .map_err(|err| ReconcileError::introspection(err.to_string()))?;
    let table_exists: bool = row.get(0);
    if !table_exists {
        return Ok(ObservedSchema {
            table_exists: false,
            ..ObservedSchema::default()
        });
    }

    let columns_query = concat!(
        "SELECT attr.attname AS column_name ",
        "FROM pg_catalog.pg_attribute attr ",
        "JOIN pg_catalog.pg_class cls ON cls.oid = attr.attrelid ",
        "JOIN pg_catalog.pg_namespace ns ON ns.oid = cls.relnamespace ",
        "WHERE ns.nspname = 'public' ",
        "  AND cls.relname = $1 ",
        "  AND attr.attnum > 0 ",
        "  AND NOT attr.attisdropped ",
        "ORDER BY attr.attnum"
    );
    let columns = tx
        .query(columns_query, &[&RSVPS_TABLE])
        .map_err(|err| ReconcileError::introspection(err.to_string()))?
        .into_iter()
        .map(|row| row.get("column_name"))
        .collect();

    let constraints_query = concat!(
        "SELECT ",
        "  con.conname AS name, ",
        "  ARRAY(",
        "    SELECT att.attname ",
        "    FROM pg_catalog.pg_attribute att ",
        "    JOIN unnest(con.conkey) WITH ORDINALITY AS key(attnum, ord) ",
        "      ON att.attnum = key.attnum ",
        "    WHERE att.attrelid = con.conrelid ",
        "    ORDER BY key.ord",
        "  ) AS columns ",
        "FROM pg_catalog.pg_constraint con ",
        "JOIN pg_catalog.pg_class cls ON cls.oid = con.conrelid ",
        "JOIN pg_catalog.pg_namespace ns ON ns.oid = cls.relnamespace ",
        "WHERE ns.nspname = 'public' ",
        "  AND cls.relname = $1 ",
        "  AND con.contype = 'u' ",
        "ORDER BY con.conname"
    );
    let unique_constraints = tx
        .query(constraints_query, &[&RSVPS_TABLE])
        .map_err(|err| ReconcileError::introspection(err.to_string()))?
        .into_iter()
        .map(|row| UniqueConstraint {
            name: row.get("name"),
            columns: row.get("columns"),
        })
        .collect();

    Ok(ObservedSchema {
        table_exists: true,
        columns,
        unique_constraints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn current_schema() -> ObservedSchema {
        ObservedSchema {
            table_exists: true,
            columns: [
                "id",
                "name",
                "email",
                "coming",
                "allergies",
                "transport_assist",
                "created_at",
            ]
            .iter()
            .map(|s| (*s).to_owned())
            .collect(),
            unique_constraints: vec![UniqueConstraint {
                name: NAME_EMAIL_CONSTRAINT.to_owned(),
                columns: vec!["name".to_owned(), "email".to_owned()],
            }],
        }
    }

    fn columns(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn absent_table_plans_create_only() {
        let observed = ObservedSchema::default();
        assert_eq!(plan(&observed), vec![DdlStep::CreateTable]);
    }

    #[test]
    fn current_table_plans_nothing() {
        assert!(plan(&current_schema()).is_empty());
    }

    #[test]
    fn planning_is_idempotent_by_construction() {
        // The plan for a current table is empty, so a second run after a
        // successful first one cannot issue DDL.
        let first = plan(&current_schema());
        let second = plan(&current_schema());
        assert!(first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn legacy_attending_is_renamed_not_readded() {
        let observed = ObservedSchema {
            columns: columns(&[
                "id",
                "name",
                "email",
                "attending",
                "allergies",
                "transport_assist",
                "created_at",
            ]),
            ..current_schema()
        };
        let steps = plan(&observed);
        assert_eq!(
            steps,
            vec![DdlStep::RenameColumn {
                from: "attending",
                to: "coming"
            }]
        );
    }

    #[test]
    fn rename_is_skipped_when_both_columns_exist() {
        // A table that somehow carries both keeps its data untouched.
        let observed = ObservedSchema {
            columns: columns(&[
                "id",
                "name",
                "email",
                "attending",
                "coming",
                "allergies",
                "transport_assist",
                "created_at",
            ]),
            ..current_schema()
        };
        assert!(plan(&observed).is_empty());
    }

    #[test]
    fn legacy_message_column_is_dropped() {
        let observed = ObservedSchema {
            columns: columns(&[
                "id",
                "name",
                "email",
                "coming",
                "message",
                "allergies",
                "transport_assist",
                "created_at",
            ]),
            ..current_schema()
        };
        assert_eq!(
            plan(&observed),
            vec![DdlStep::DropColumn {
                name: "message".to_owned()
            }]
        );
    }

    #[test]
    fn missing_columns_are_added_with_their_defaults() {
        let observed = ObservedSchema {
            columns: columns(&["id", "name", "email", "coming", "created_at"]),
            ..current_schema()
        };
        assert_eq!(
            plan(&observed),
            vec![
                DdlStep::AddColumn {
                    name: "allergies",
                    definition: "VARCHAR(500)"
                },
                DdlStep::AddColumn {
                    name: "transport_assist",
                    definition: "BOOLEAN DEFAULT false"
                },
            ]
        );
    }

    #[test]
    fn email_only_constraint_is_dropped() {
        let observed = ObservedSchema {
            unique_constraints: vec![
                UniqueConstraint {
                    name: "rsvps_email_key".to_owned(),
                    columns: vec!["email".to_owned()],
                },
                UniqueConstraint {
                    name: NAME_EMAIL_CONSTRAINT.to_owned(),
                    columns: vec!["name".to_owned(), "email".to_owned()],
                },
            ],
            ..current_schema()
        };
        assert_eq!(
            plan(&observed),
            vec![DdlStep::DropConstraint {
                name: "rsvps_email_key".to_owned()
            }]
        );
    }

    #[test]
    fn natural_key_under_any_name_satisfies_the_invariant() {
        let observed = ObservedSchema {
            unique_constraints: vec![UniqueConstraint {
                name: "uq_rsvps_natural".to_owned(),
                columns: vec!["name".to_owned(), "email".to_owned()],
            }],
            ..current_schema()
        };
        assert!(plan(&observed).is_empty());
    }

    #[test]
    fn full_legacy_shape_plans_every_step_in_order() {
        let observed = ObservedSchema {
            table_exists: true,
            columns: columns(&["id", "name", "email", "attending", "message", "created_at"]),
            unique_constraints: vec![UniqueConstraint {
                name: "rsvps_email_key".to_owned(),
                columns: vec!["email".to_owned()],
            }],
        };
        assert_eq!(
            plan(&observed),
            vec![
                DdlStep::RenameColumn {
                    from: "attending",
                    to: "coming"
                },
                DdlStep::DropColumn {
                    name: "message".to_owned()
                },
                DdlStep::AddColumn {
                    name: "allergies",
                    definition: "VARCHAR(500)"
                },
                DdlStep::AddColumn {
                    name: "transport_assist",
                    definition: "BOOLEAN DEFAULT false"
                },
                DdlStep::DropConstraint {
                    name: "rsvps_email_key".to_owned()
                },
                DdlStep::AddNaturalKeyConstraint,
            ]
        );
    }

    #[rstest]
    #[case(
        DdlStep::RenameColumn { from: "attending", to: "coming" },
        "ALTER TABLE rsvps RENAME COLUMN attending TO coming"
    )]
    #[case(
        DdlStep::DropColumn { name: "message".to_owned() },
        "ALTER TABLE rsvps DROP COLUMN message"
    )]
    #[case(
        DdlStep::AddColumn { name: "allergies", definition: "VARCHAR(500)" },
        "ALTER TABLE rsvps ADD COLUMN allergies VARCHAR(500)"
    )]
    #[case(
        DdlStep::DropConstraint { name: "rsvps_email_key".to_owned() },
        "ALTER TABLE rsvps DROP CONSTRAINT rsvps_email_key"
    )]
    fn steps_render_executable_statements(#[case] step: DdlStep, #[case] expected: &str) {
        assert_eq!(step.statement(), expected);
    }

    #[test]
    fn natural_key_statement_names_the_conventional_constraint() {
        let statement = DdlStep::AddNaturalKeyConstraint.statement();
        assert!(statement.contains(NAME_EMAIL_CONSTRAINT));
        assert!(statement.contains("UNIQUE (name, email)"));
    }

    #[test]
    fn create_table_carries_the_full_shape() {
        let statement = DdlStep::CreateTable.statement();
        for column in [
            "id",
            "name",
            "email",
            "coming",
            "allergies",
            "transport_assist",
            "created_at",
        ] {
            assert!(statement.contains(column), "{column} in CREATE TABLE");
        }
        assert!(statement.contains("UNIQUE (name, email)"));
    }
}
