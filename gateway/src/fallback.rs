//! Placeholder statistics served when the procurement API cannot answer.

use crate::stats::{Source, StatCategory, StatRecord};

pub struct FallbackStat {
    pub label: &'static str,
    pub code: Option<i64>,
    pub quantity: u64,
    pub amount: f64,
}

const fn stat(label: &'static str, quantity: u64, amount: f64) -> FallbackStat {
    FallbackStat {
        label,
        code: None,
        quantity,
        amount,
    }
}

const fn modality(label: &'static str, code: i64, quantity: u64, amount: f64) -> FallbackStat {
    FallbackStat {
        label,
        code: Some(code),
        quantity,
        amount,
    }
}

const MODALIDADES: &[FallbackStat] = &[
    modality("Pregão", 6, 45, 1250000.50),
    modality("Concorrência", 1, 12, 3200000.75),
    modality("Tomada de Preços", 2, 8, 850000.25),
    modality("Credenciamento", 12, 22, 1950000.00),
    modality("Dispensa de Licitação", 7, 67, 4200000.30),
    modality("Inexigibilidade de Licitação", 8, 15, 950000.00),
    modality("Convite", 3, 5, 320000.00),
];

const UF: &[FallbackStat] = &[
    stat("SP", 89, 7800000.50),
    stat("RJ", 45, 3200000.75),
    stat("MG", 67, 4500000.25),
    stat("RS", 34, 2100000.00),
    stat("PR", 28, 1800000.30),
    stat("SC", 22, 1500000.00),
    stat("GO", 19, 1300000.50),
    stat("DF", 16, 2200000.00),
    stat("PE", 14, 950000.75),
    stat("CE", 12, 875000.25),
];

const TIPO_ORGAO: &[FallbackStat] = &[
    stat("Prefeitura", 125, 8900000.50),
    stat("Ministério", 42, 15600000.75),
    stat("Universidade", 38, 3200000.25),
    stat("Empresa Pública", 27, 4500000.00),
    stat("Autarquia", 19, 2100000.30),
];

const CONTRATOS: &[FallbackStat] = &[
    stat("Contrato", 125, 8900000.50),
    stat("Aditivo", 42, 15600000.75),
    stat("Rescisão", 5, 3200000.25),
];

const ATAS: &[FallbackStat] = &[
    stat("Ata de Registro", 78, 5600000.50),
    stat("Adesão", 24, 1800000.75),
    stat("Renovação", 12, 950000.25),
];

const PLANOS: &[FallbackStat] = &[
    stat("Plano Anual", 156, 25600000.50),
    stat("Plano Trimestral", 89, 8900000.75),
    stat("Plano Semestral", 67, 12400000.25),
];

fn table(category: StatCategory) -> &'static [FallbackStat] {
    match category {
        StatCategory::Modalidades => MODALIDADES,
        StatCategory::Uf => UF,
        StatCategory::TipoOrgao => TIPO_ORGAO,
        StatCategory::Contratos => CONTRATOS,
        StatCategory::Atas => ATAS,
        StatCategory::Planos => PLANOS,
    }
}

/// The full placeholder list for a category, in table order.
pub fn records(category: StatCategory) -> Vec<StatRecord> {
    table(category)
        .iter()
        .map(|stat| StatRecord {
            label: stat.label.to_string(),
            code: stat.code,
            quantity: stat.quantity,
            amount: stat.amount,
            source: Source::Fallback,
        })
        .collect()
}
