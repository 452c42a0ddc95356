// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ───────────────────────────────────────
// Clientes & contatos
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Cliente {
    pub id: Uuid,
    pub nome_cadastro: String,
    pub tipo_cliente: Option<String>, // "PF" | "PJ"
    pub documento: Option<String>,    // digits only
    pub razao_social: Option<String>,
    pub nome_fantasia: Option<String>,
    pub apelido_relacionamento: Option<String>,
    pub telefone_principal: Option<String>,
    pub email_principal: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub complemento: Option<String>,
    pub bairro: Option<String>,
    pub municipio: Option<String>,
    pub uf: Option<String>,
    pub cep: Option<String>,
    pub observacoes: Option<String>,
    pub tags: Option<Vec<String>>, // text[]
    pub favorito: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Contato {
    pub id: Uuid,
    pub nome_completo: String,
    pub apelido_relacionamento: Option<String>,
    pub cargo: Option<String>,
    pub celular: Option<String>,
    pub email: Option<String>,
    pub observacoes: Option<String>,
    pub data_aniversario: Option<NaiveDate>,
    pub pessoa_site: Option<String>,
    pub pessoa_redes: Option<String>,
    pub canal_relatorio: Option<Vec<String>>, // email | whatsapp | grupo_whatsapp
    pub autorizacao_mensagem: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Vínculos cliente ↔ contato
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Vinculo {
    pub id: Uuid,
    pub cliente_id: Uuid,
    pub contato_id: Uuid,
    pub contato_principal: bool,
    pub cargo_no_cliente: Option<String>,
    pub observacoes_relacionamento: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Link as seen from a client page: the linked contact's details inline.
#[derive(Debug, Serialize, FromRow)]
pub struct VinculoComContato {
    pub id: Uuid,
    pub cliente_id: Uuid,
    pub contato_id: Uuid,
    pub contato_principal: bool,
    pub cargo_no_cliente: Option<String>,
    pub observacoes_relacionamento: Option<String>,
    pub created_at: DateTime<Utc>,
    pub contato_nome_completo: String,
    pub contato_cargo: Option<String>,
    pub contato_celular: Option<String>,
    pub contato_email: Option<String>,
}

/// Link as seen from a contact page.
#[derive(Debug, Serialize, FromRow)]
pub struct VinculoComCliente {
    pub id: Uuid,
    pub cliente_id: Uuid,
    pub contato_id: Uuid,
    pub contato_principal: bool,
    pub cargo_no_cliente: Option<String>,
    pub created_at: DateTime<Utc>,
    pub cliente_razao_social: Option<String>,
    pub cliente_tipo_cliente: Option<String>,
}

// ───────────────────────────────────────
// Dados técnicos da usina
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ClienteTecnica {
    pub id: Uuid,
    pub cliente_id: Uuid,
    pub documento: Option<String>,
    pub nome_planta: Option<String>,
    pub modalidade: Option<String>,
    pub classificacao: Option<String>,
    pub tipo_local: Option<String>,
    pub possui_internet: Option<bool>,
    pub data_install: Option<NaiveDate>,
    pub venc_garantia: Option<NaiveDate>,
    pub garantia_extendida: Option<String>,
    pub potencia_usina_kwp: Option<f64>,
    pub quant_inverter: Option<i32>,
    pub marca_inverter: Option<String>,
    pub mod_inverter: Option<String>,
    pub serie_inverter: Option<String>,
    pub quant_modulos: Option<i32>,
    pub marca_modulos: Option<String>,
    pub mod_modulos: Option<String>,
}

/// Every client, with its technical row merged in when one exists.
#[derive(Debug, Serialize, FromRow)]
pub struct ClienteComTecnica {
    pub cliente_id: Uuid,
    pub razao_social: Option<String>,
    pub documento: Option<String>,
    pub telefone_principal: Option<String>,
    pub email_principal: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub tecnica_id: Option<Uuid>,
    pub nome_planta: Option<String>,
    pub modalidade: Option<String>,
    pub classificacao: Option<String>,
    pub tipo_local: Option<String>,
    pub possui_internet: bool,
    pub data_install: Option<NaiveDate>,
    pub venc_garantia: Option<NaiveDate>,
    pub garantia_extendida: Option<String>,
    pub potencia_usina_kwp: Option<f64>,
    pub quant_inverter: Option<i32>,
    pub marca_inverter: Option<String>,
    pub mod_inverter: Option<String>,
    pub serie_inverter: Option<String>,
    pub quant_modulos: Option<i32>,
    pub marca_modulos: Option<String>,
    pub mod_modulos: Option<String>,
}

// ───────────────────────────────────────
// Envio de relatórios
// ───────────────────────────────────────

/// `relatorio_envios` row joined with the client name and contact phone/role.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RelatorioEnvioRow {
    pub id: i64,
    pub nome_falado_dono: Option<String>,
    pub status_envio: Option<String>,
    pub viewed: Option<bool>,
    pub enviado_em: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub cliente_id: Option<Uuid>,
    pub contato_id: Option<Uuid>,
    pub cliente_nome: Option<String>,
    pub contato_celular: Option<String>,
    pub contato_cargo: Option<String>,
}

// ───────────────────────────────────────
// DTOs helpful for endpoints
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}
