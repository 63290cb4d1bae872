//! Static capability flags of the engine, as reported to clients asking what the driver
//! supports.

/// A feature the engine may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    MixedCaseIdentifiers,
    MixedCaseQuotedIdentifiers,
    AlterTableWithAddColumn,
    AlterTableWithDropColumn,
    ColumnAliasing,
    Convert,
    TableCorrelationNames,
    DifferentTableCorrelationNames,
    ExpressionsInOrderBy,
    OrderByUnrelated,
    GroupBy,
    GroupByUnrelated,
    GroupByBeyondSelect,
    LikeEscapeClause,
    MultipleResultSets,
    MultipleTransactions,
    NonNullableColumns,
    MinimumSqlGrammar,
    CoreSqlGrammar,
    ExtendedSqlGrammar,
    IntegrityEnhancementFacility,
    OuterJoins,
    FullOuterJoins,
    LimitedOuterJoins,
    SchemasInDataManipulation,
    SchemasInProcedureCalls,
    SchemasInTableDefinitions,
    SchemasInIndexDefinitions,
    SchemasInPrivilegeDefinitions,
    CatalogsInDataManipulation,
    CatalogsInProcedureCalls,
    CatalogsInTableDefinitions,
    CatalogsInIndexDefinitions,
    CatalogsInPrivilegeDefinitions,
    PositionedDelete,
    PositionedUpdate,
    SelectForUpdate,
    StoredProcedures,
    SubqueriesInComparisons,
    SubqueriesInExists,
    SubqueriesInIns,
    SubqueriesInQuantifieds,
    CorrelatedSubqueries,
    Union,
    UnionAll,
    OpenCursorsAcrossCommit,
    OpenCursorsAcrossRollback,
    OpenStatementsAcrossCommit,
    OpenStatementsAcrossRollback,
    Transactions,
    DataDefinitionAndDataManipulationTransactions,
    DataManipulationTransactionsOnly,
    BatchUpdates,
    Savepoints,
    NamedParameters,
    MultipleOpenResults,
    GetGeneratedKeys,
    StatementPooling,
    StoredFunctionsUsingCallSyntax,
}

/// Capabilities whose support does not depend on the configuration.
const FIXED_CAPABILITIES: &[(Capability, bool)] = &[
    (Capability::MixedCaseIdentifiers, false),
    (Capability::MixedCaseQuotedIdentifiers, true),
    (Capability::AlterTableWithAddColumn, true),
    (Capability::AlterTableWithDropColumn, true),
    (Capability::ColumnAliasing, true),
    (Capability::Convert, true),
    (Capability::TableCorrelationNames, true),
    (Capability::DifferentTableCorrelationNames, true),
    (Capability::ExpressionsInOrderBy, true),
    (Capability::OrderByUnrelated, true),
    (Capability::GroupBy, true),
    (Capability::GroupByUnrelated, true),
    (Capability::GroupByBeyondSelect, true),
    (Capability::LikeEscapeClause, true),
    (Capability::MultipleResultSets, false),
    (Capability::MultipleTransactions, true),
    (Capability::NonNullableColumns, true),
    (Capability::MinimumSqlGrammar, true),
    (Capability::CoreSqlGrammar, true),
    (Capability::ExtendedSqlGrammar, true),
    (Capability::IntegrityEnhancementFacility, true),
    (Capability::OuterJoins, true),
    (Capability::FullOuterJoins, true),
    (Capability::LimitedOuterJoins, true),
    (Capability::CatalogsInDataManipulation, true),
    (Capability::CatalogsInProcedureCalls, true),
    (Capability::CatalogsInTableDefinitions, true),
    (Capability::CatalogsInIndexDefinitions, true),
    (Capability::CatalogsInPrivilegeDefinitions, true),
    (Capability::PositionedDelete, true),
    (Capability::PositionedUpdate, true),
    (Capability::SelectForUpdate, true),
    (Capability::StoredProcedures, true),
    (Capability::SubqueriesInComparisons, true),
    (Capability::SubqueriesInExists, true),
    (Capability::SubqueriesInIns, true),
    (Capability::SubqueriesInQuantifieds, true),
    (Capability::CorrelatedSubqueries, true),
    (Capability::Union, true),
    (Capability::UnionAll, true),
    (Capability::OpenCursorsAcrossCommit, true),
    (Capability::OpenCursorsAcrossRollback, false),
    (Capability::OpenStatementsAcrossCommit, true),
    (Capability::OpenStatementsAcrossRollback, true),
    (Capability::Transactions, true),
    (Capability::DataDefinitionAndDataManipulationTransactions, false),
    (Capability::DataManipulationTransactionsOnly, true),
    (Capability::BatchUpdates, true),
    (Capability::Savepoints, true),
    (Capability::NamedParameters, true),
    (Capability::MultipleOpenResults, true),
    (Capability::GetGeneratedKeys, true),
    (Capability::StatementPooling, true),
    (Capability::StoredFunctionsUsingCallSyntax, true),
];

/// Answers which [`Capability`]s the driver supports.
///
/// ```
/// use engine_driver::{Capability, DriverCapabilities};
///
/// let capabilities = DriverCapabilities::default();
/// assert!(capabilities.supports(Capability::NamedParameters));
/// assert!(!capabilities.supports(Capability::MultipleResultSets));
///
/// let capabilities = DriverCapabilities { schemas_in_statements: false };
/// assert!(!capabilities.supports(Capability::SchemasInDataManipulation));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverCapabilities {
    /// Whether schema names may be used to qualify objects in statements. Set by a connection
    /// property of the engine.
    pub schemas_in_statements: bool,
}

impl Default for DriverCapabilities {
    fn default() -> Self {
        Self {
            schemas_in_statements: true,
        }
    }
}

impl DriverCapabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::SchemasInDataManipulation
            | Capability::SchemasInProcedureCalls
            | Capability::SchemasInTableDefinitions
            | Capability::SchemasInIndexDefinitions
            | Capability::SchemasInPrivilegeDefinitions => self.schemas_in_statements,
            fixed => FIXED_CAPABILITIES
                .iter()
                .find(|(candidate, _)| *candidate == fixed)
                .is_some_and(|&(_, supported)| supported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Capability, DriverCapabilities, FIXED_CAPABILITIES};

    #[test]
    fn every_fixed_capability_is_listed_once() {
        for (index, (capability, _)) in FIXED_CAPABILITIES.iter().enumerate() {
            assert!(
                !FIXED_CAPABILITIES[index + 1..]
                    .iter()
                    .any(|(other, _)| other == capability),
                "{capability:?} listed twice"
            );
        }
    }

    #[test]
    fn schema_capabilities_follow_configuration() {
        let enabled = DriverCapabilities::default();
        let disabled = DriverCapabilities {
            schemas_in_statements: false,
        };

        assert!(enabled.supports(Capability::SchemasInProcedureCalls));
        assert!(!disabled.supports(Capability::SchemasInProcedureCalls));
        assert!(disabled.supports(Capability::CatalogsInProcedureCalls));
    }

    #[test]
    fn unsupported_transactions_mixing_ddl() {
        let capabilities = DriverCapabilities::default();
        assert!(!capabilities.supports(Capability::DataDefinitionAndDataManipulationTransactions));
        assert!(!capabilities.supports(Capability::OpenCursorsAcrossRollback));
        assert!(capabilities.supports(Capability::Savepoints));
    }
}
