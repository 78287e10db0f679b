use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;
use crate::models::{NaturalKey, NormalizedRecord};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS captacoes (
    id INTEGER PRIMARY KEY,
    data_captacao TEXT NOT NULL,
    cod_assessor TEXT NOT NULL,
    cod_cliente TEXT NOT NULL,
    tipo_captacao TEXT NOT NULL,
    cod_auxiliar TEXT NOT NULL,
    valor_captacao REAL NOT NULL,
    data_atualizacao TEXT NOT NULL,
    tipo_pessoa TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_captacoes_chave
    ON captacoes (data_captacao, cod_cliente, cod_assessor);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Distinct natural-key component values observed across one upload's
/// candidate records. One store query filters on all six at once, so the
/// query count stays constant regardless of row count.
#[derive(Debug, Default)]
pub struct KeyFilter {
    pub datas_captacao: Vec<String>,
    pub datas_atualizacao: Vec<String>,
    pub clientes: Vec<String>,
    pub tipos: Vec<String>,
    pub assessores: Vec<String>,
    pub valores: Vec<f64>,
}

impl KeyFilter {
    pub fn is_empty(&self) -> bool {
        self.datas_captacao.is_empty()
            || self.datas_atualizacao.is_empty()
            || self.clientes.is_empty()
            || self.tipos.is_empty()
            || self.assessores.is_empty()
            || self.valores.is_empty()
    }
}

/// The two store operations the pipeline consumes. Kept behind a trait so
/// the committer and orchestrator can be exercised against in-memory and
/// deliberately failing stores.
pub trait CaptacaoStore {
    /// Insert all records or none of them.
    fn insert_batch(&mut self, records: &[NormalizedRecord]) -> Result<()>;

    /// Natural keys of persisted rows matching the intersection filter.
    fn find_existing_keys(&self, filter: &KeyFilter) -> Result<Vec<NaturalKey>>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        SqliteStore { conn }
    }

    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::new(get_connection(db_path)?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn placeholders(n: usize) -> String {
    let mut s = "?,".repeat(n);
    s.pop();
    s
}

impl CaptacaoStore for SqliteStore {
    fn insert_batch(&mut self, records: &[NormalizedRecord]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO captacoes \
                 (data_captacao, cod_assessor, cod_cliente, tipo_captacao, cod_auxiliar, \
                  valor_captacao, data_atualizacao, tipo_pessoa) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for r in records {
                stmt.execute(rusqlite::params![
                    r.data_captacao,
                    r.cod_assessor,
                    r.cod_cliente,
                    r.tipo_captacao,
                    r.cod_auxiliar,
                    r.valor_captacao,
                    r.data_atualizacao,
                    r.tipo_pessoa,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn find_existing_keys(&self, filter: &KeyFilter) -> Result<Vec<NaturalKey>> {
        if filter.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT data_captacao, data_atualizacao, cod_cliente, tipo_captacao, \
                    cod_assessor, valor_captacao \
             FROM captacoes \
             WHERE data_captacao IN ({}) \
               AND data_atualizacao IN ({}) \
               AND cod_cliente IN ({}) \
               AND tipo_captacao IN ({}) \
               AND cod_assessor IN ({}) \
               AND valor_captacao IN ({})",
            placeholders(filter.datas_captacao.len()),
            placeholders(filter.datas_atualizacao.len()),
            placeholders(filter.clientes.len()),
            placeholders(filter.tipos.len()),
            placeholders(filter.assessores.len()),
            placeholders(filter.valores.len()),
        );

        let mut params: Vec<rusqlite::types::Value> = Vec::new();
        for v in &filter.datas_captacao {
            params.push(v.clone().into());
        }
        for v in &filter.datas_atualizacao {
            params.push(v.clone().into());
        }
        for v in &filter.clientes {
            params.push(v.clone().into());
        }
        for v in &filter.tipos {
            params.push(v.clone().into());
        }
        for v in &filter.assessores {
            params.push(v.clone().into());
        }
        for v in &filter.valores {
            params.push((*v).into());
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let keys = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                Ok(NaturalKey::from_parts(
                    &row.get::<_, String>(0)?,
                    &row.get::<_, String>(1)?,
                    &row.get::<_, String>(2)?,
                    &row.get::<_, String>(3)?,
                    &row.get::<_, String>(4)?,
                    row.get::<_, f64>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cliente: &str, valor: f64) -> NormalizedRecord {
        NormalizedRecord {
            data_captacao: "2024-03-15".to_string(),
            cod_assessor: "A001".to_string(),
            cod_cliente: cliente.to_string(),
            tipo_captacao: "APORTE".to_string(),
            cod_auxiliar: "X".to_string(),
            valor_captacao: valor,
            data_atualizacao: "2024-03-16".to_string(),
            tipo_pessoa: "PF".to_string(),
        }
    }

    fn test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, SqliteStore::new(conn))
    }

    #[test]
    fn test_insert_batch_and_query_back() {
        let (_dir, mut store) = test_store();
        store.insert_batch(&[record("C500", 1000.5), record("C501", 10.0)]).unwrap();
        let count: i64 = store
            .connection()
            .query_row("SELECT count(*) FROM captacoes", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_find_existing_keys_intersection() {
        let (_dir, mut store) = test_store();
        store.insert_batch(&[record("C500", 1000.5), record("C501", 10.0)]).unwrap();

        let filter = KeyFilter {
            datas_captacao: vec!["2024-03-15".to_string()],
            datas_atualizacao: vec!["2024-03-16".to_string()],
            clientes: vec!["C500".to_string(), "C999".to_string()],
            tipos: vec!["APORTE".to_string()],
            assessores: vec!["A001".to_string()],
            valores: vec![1000.5],
        };
        let keys = store.find_existing_keys(&filter).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0], NaturalKey::of(&record("C500", 1000.5)));
    }

    #[test]
    fn test_find_existing_keys_empty_filter_short_circuits() {
        let (_dir, store) = test_store();
        let keys = store.find_existing_keys(&KeyFilter::default()).unwrap();
        assert!(keys.is_empty());
    }

    #[test]
    fn test_amount_round_trips_exactly() {
        let (_dir, mut store) = test_store();
        store.insert_batch(&[record("C500", 1000.50)]).unwrap();
        let stored: f64 = store
            .connection()
            .query_row("SELECT valor_captacao FROM captacoes", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stored.to_bits(), 1000.50_f64.to_bits());
    }
}
