use std::collections::{BTreeSet, HashSet};

use crate::db::{CaptacaoStore, KeyFilter};
use crate::error::Result;
use crate::fmt::money;
use crate::models::{NaturalKey, NormalizedRecord};

/// How many duplicate rows are summarized for the operator.
pub const DUPLICATE_SAMPLE_MAX: usize = 5;

#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub new_records: Vec<NormalizedRecord>,
    pub duplicate_count: usize,
    pub duplicate_sample: Vec<String>,
}

/// Partition candidate records into new vs. already persisted. One
/// intersection query against the store, then exact tuple comparison of
/// the natural keys; a re-run of the same upload is idempotent.
pub fn partition_new(
    store: &dyn CaptacaoStore,
    records: Vec<NormalizedRecord>,
) -> Result<DedupOutcome> {
    if records.is_empty() {
        return Ok(DedupOutcome::default());
    }

    let filter = key_filter(&records);
    let existing: HashSet<NaturalKey> = store.find_existing_keys(&filter)?.into_iter().collect();

    let mut outcome = DedupOutcome::default();
    for record in records {
        if existing.contains(&NaturalKey::of(&record)) {
            outcome.duplicate_count += 1;
            if outcome.duplicate_sample.len() < DUPLICATE_SAMPLE_MAX {
                outcome.duplicate_sample.push(sample_line(&record));
            }
        } else {
            outcome.new_records.push(record);
        }
    }
    Ok(outcome)
}

fn key_filter(records: &[NormalizedRecord]) -> KeyFilter {
    let mut datas_captacao = BTreeSet::new();
    let mut datas_atualizacao = BTreeSet::new();
    let mut clientes = BTreeSet::new();
    let mut tipos = BTreeSet::new();
    let mut assessores = BTreeSet::new();
    let mut valor_bits = BTreeSet::new();

    for r in records {
        datas_captacao.insert(r.data_captacao.clone());
        datas_atualizacao.insert(r.data_atualizacao.clone());
        clientes.insert(r.cod_cliente.clone());
        tipos.insert(r.tipo_captacao.clone());
        assessores.insert(r.cod_assessor.clone());
        valor_bits.insert(r.valor_captacao.to_bits());
    }

    KeyFilter {
        datas_captacao: datas_captacao.into_iter().collect(),
        datas_atualizacao: datas_atualizacao.into_iter().collect(),
        clientes: clientes.into_iter().collect(),
        tipos: tipos.into_iter().collect(),
        assessores: assessores.into_iter().collect(),
        valores: valor_bits.into_iter().map(f64::from_bits).collect(),
    }
}

fn sample_line(r: &NormalizedRecord) -> String {
    format!(
        "{} / {} / {} / {} / {}",
        r.data_captacao,
        r.cod_cliente,
        r.tipo_captacao,
        r.cod_assessor,
        money(r.valor_captacao)
    )
}
