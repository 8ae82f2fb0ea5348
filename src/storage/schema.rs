//! Physical schema of the record table
//!
//! `RecordColumn` is the single source of truth for the column list: the
//! SELECT list is generated from `RecordColumn::ALL`, and row decoding reads
//! each field by `RecordColumn::index`. A const assertion below keeps the
//! two in lock-step, so reordering one without the other fails to compile.

/// Name of the append-only record table
pub const TABLE_NAME: &str = "transactionRecord";

/// DDL applied (idempotently) when the store opens
pub const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS transactionRecord (
        transactionRecordId INTEGER PRIMARY KEY AUTOINCREMENT,
        uniqueId TEXT NOT NULL,
        insertTimestamp TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        eventTimestamp TEXT NOT NULL,
        eventType TEXT NOT NULL,
        data TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactionRecord_uniqueId
        ON transactionRecord(uniqueId);
    CREATE INDEX IF NOT EXISTS idx_transactionRecord_eventTimestamp
        ON transactionRecord(eventTimestamp);
    CREATE INDEX IF NOT EXISTS idx_transactionRecord_eventType
        ON transactionRecord(eventType);
";

/// Columns of the record table, in SELECT order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordColumn {
    TransactionRecordId = 0,
    UniqueId = 1,
    InsertTimestamp = 2,
    EventTimestamp = 3,
    EventType = 4,
    Data = 5,
}

impl RecordColumn {
    /// Every column, positioned at its own index
    pub const ALL: [RecordColumn; 6] = [
        RecordColumn::TransactionRecordId,
        RecordColumn::UniqueId,
        RecordColumn::InsertTimestamp,
        RecordColumn::EventTimestamp,
        RecordColumn::EventType,
        RecordColumn::Data,
    ];

    /// Column name as it appears in SQL
    pub const fn name(self) -> &'static str {
        match self {
            RecordColumn::TransactionRecordId => "transactionRecordId",
            RecordColumn::UniqueId => "uniqueId",
            RecordColumn::InsertTimestamp => "insertTimestamp",
            RecordColumn::EventTimestamp => "eventTimestamp",
            RecordColumn::EventType => "eventType",
            RecordColumn::Data => "data",
        }
    }

    /// Position of this column in a selected row
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Comma-separated SELECT list in row order
    pub fn select_list() -> String {
        Self::ALL
            .iter()
            .map(|c| c.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

const _: () = {
    let mut i = 0;
    while i < RecordColumn::ALL.len() {
        assert!(RecordColumn::ALL[i].index() == i);
        i += 1;
    }
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_list_order() {
        assert_eq!(
            RecordColumn::select_list(),
            "transactionRecordId, uniqueId, insertTimestamp, eventTimestamp, eventType, data"
        );
    }

    #[test]
    fn test_schema_applies_cleanly_twice() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [TABLE_NAME],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_insert_timestamp_default_is_store_format() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute(
            "INSERT INTO transactionRecord (uniqueId, eventTimestamp, eventType, data)
             VALUES ('tx', '2024-01-01 00:00:00.000', 'CREATED', '{}')",
            [],
        )
        .unwrap();

        let stamp: String = conn
            .query_row("SELECT insertTimestamp FROM transactionRecord", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert!(crate::storage::timestamp::decode(&stamp).is_ok());
        assert_eq!(stamp.len(), "2024-01-01 00:00:00.000".len());
    }
}
