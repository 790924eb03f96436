//! Typed view over the inbound PAC document body.
//!
//! Only the fields the gateway reads are modelled; everything else stays in
//! the verbatim `originalData` value and is forwarded to the PAC untouched.
//! Deserialization happens after schema validation, so these types only need
//! to be as strict as the mapper requires.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePayload {
    pub documento: Documento,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Documento {
    #[serde(default)]
    pub codigo_sucursal_emisor: Option<String>,
    pub datos_transaccion: DatosTransaccion,
    pub lista_items: ListaItems,
    pub totales_sub_totales: TotalesSubTotales,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatosTransaccion {
    pub tipo_documento: String,
    pub numero_documento_fiscal: String,
    pub punto_facturacion_fiscal: String,
    pub fecha_emision: String,
    pub cliente: Cliente,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cliente {
    #[serde(rename = "tipoClienteFE")]
    pub tipo_cliente_fe: String,
    #[serde(rename = "numeroRUC", default)]
    pub numero_ruc: Option<String>,
    #[serde(rename = "razonSocial")]
    pub razon_social: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListaItems {
    pub item: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub descripcion: String,
    pub cantidad: String,
    pub precio_unitario: String,
    pub valor_total: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalesSubTotales {
    #[serde(rename = "totalPrecioNeto")]
    pub total_precio_neto: String,
    #[serde(rename = "totalITBMS")]
    pub total_itbms: String,
    #[serde(rename = "totalFactura")]
    pub total_factura: String,
    #[serde(rename = "nroItems")]
    pub nro_items: String,
}
