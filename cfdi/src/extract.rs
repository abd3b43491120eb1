use crate::document::CfdiDocument;
use addenda_xml::Element;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Comprobante attribute to extracted key.
const COMPROBANTE_KEYS: &[(&str, &str)] = &[
    ("Version", "version"),
    ("Serie", "serie"),
    ("Folio", "folio"),
    ("Fecha", "fecha"),
    ("FormaPago", "forma_pago"),
    ("MetodoPago", "metodo_pago"),
    ("Moneda", "moneda"),
    ("TipoCambio", "tipo_cambio"),
    ("SubTotal", "subtotal"),
    ("Descuento", "descuento"),
    ("Total", "total"),
    ("TipoDeComprobante", "tipo_comprobante"),
    ("LugarExpedicion", "lugar_expedicion"),
    ("Exportacion", "exportacion"),
];

const TIMBRE_KEYS: &[(&str, &str)] = &[("UUID", "uuid"), ("FechaTimbrado", "fecha_timbrado")];

const EMISOR_KEYS: &[(&str, &str)] = &[
    ("Rfc", "emisor_rfc"),
    ("Nombre", "emisor_nombre"),
    ("RegimenFiscal", "emisor_regimen_fiscal"),
];

const RECEPTOR_KEYS: &[(&str, &str)] = &[
    ("Rfc", "receptor_rfc"),
    ("Nombre", "receptor_nombre"),
    ("UsoCFDI", "receptor_uso_cfdi"),
    ("DomicilioFiscalReceptor", "receptor_domicilio_fiscal"),
    ("RegimenFiscalReceptor", "receptor_regimen_fiscal"),
];

const CONCEPTO_KEYS: &[(&str, &str)] = &[
    ("ClaveProdServ", "concepto_clave_prod_serv"),
    ("NoIdentificacion", "concepto_no_identificacion"),
    ("Cantidad", "concepto_cantidad"),
    ("ClaveUnidad", "concepto_clave_unidad"),
    ("Unidad", "concepto_unidad"),
    ("Descripcion", "concepto_descripcion"),
    ("ValorUnitario", "concepto_valor_unitario"),
    ("Importe", "concepto_importe"),
];

fn copy_attributes(element: &Element, keys: &[(&str, &str)], data: &mut BTreeMap<String, String>) {
    for (attribute, key) in keys {
        if let Some(value) = element.attribute(attribute) {
            data.insert(key.to_string(), value.to_string());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tax {
    pub impuesto: Option<String>,
    pub tipo_factor: Option<String>,
    pub tasa_o_cuota: Option<String>,
    pub base: Option<String>,
    pub importe: Option<String>,
}

impl Tax {
    fn from_element(element: &Element) -> Self {
        let attribute = |name: &str| element.attribute(name).map(str::to_string);
        Self {
            impuesto: attribute("Impuesto"),
            tipo_factor: attribute("TipoFactor"),
            tasa_o_cuota: attribute("TasaOCuota"),
            base: attribute("Base"),
            importe: attribute("Importe"),
        }
    }
}

/// One `Concepto` with its taxes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub clave_prod_serv: Option<String>,
    pub no_identificacion: Option<String>,
    pub cantidad: Option<String>,
    pub clave_unidad: Option<String>,
    pub unidad: Option<String>,
    pub descripcion: Option<String>,
    pub valor_unitario: Option<String>,
    pub importe: Option<String>,
    pub descuento: Option<String>,
    pub objeto_imp: Option<String>,
    pub traslados: Vec<Tax>,
    pub retenciones: Vec<Tax>,
}

impl CfdiDocument {
    /// Flat invoice data. Only attributes present in the document produce keys; of the line items
    /// only the first one is included here, see [`line_items`](Self::line_items) for all of them.
    pub fn extract_data(&self) -> BTreeMap<String, String> {
        let mut data = BTreeMap::new();
        copy_attributes(self.root(), COMPROBANTE_KEYS, &mut data);

        if let Some(timbre) = self.timbre_fiscal_digital() {
            copy_attributes(timbre, TIMBRE_KEYS, &mut data);
        }
        if let Some(emisor) = self.find("Emisor") {
            copy_attributes(emisor, EMISOR_KEYS, &mut data);
        }
        if let Some(receptor) = self.find("Receptor") {
            copy_attributes(receptor, RECEPTOR_KEYS, &mut data);
        }
        if let Some(concepto) = self.find("Concepto") {
            copy_attributes(concepto, CONCEPTO_KEYS, &mut data);
        }

        let impuestos = self
            .root()
            .child_elements()
            .find(|e| self.is_cfdi(e, "Impuestos"))
            .and_then(|e| e.attribute("TotalImpuestosTrasladados"));
        if let Some(total) = impuestos {
            data.insert("impuestos".to_string(), total.to_string());
        }

        tracing::debug!(keys = data.len(), "extracted CFDI data");
        data
    }

    /// The stamp inside `Complemento`, or failing that any element whose name mentions it.
    pub fn timbre_fiscal_digital(&self) -> Option<&Element> {
        let tfd = self.namespace_uri(&self.config.namespaces.tfd_prefix);
        self.find("Complemento")
            .and_then(|complemento| complemento.find_child(tfd, "TimbreFiscalDigital"))
            .or_else(|| {
                self.root()
                    .descendants()
                    .find(|e| e.local_name().contains("TimbreFiscalDigital"))
            })
    }

    pub fn line_items(&self) -> Vec<LineItem> {
        self.root()
            .descendants()
            .filter(|e| self.is_cfdi(e, "Concepto"))
            .map(|concepto| {
                let attribute = |name: &str| concepto.attribute(name).map(str::to_string);
                let taxes = |local: &str| -> Vec<Tax> {
                    concepto
                        .descendants()
                        .filter(|e| self.is_cfdi(e, local))
                        .map(Tax::from_element)
                        .collect()
                };
                LineItem {
                    clave_prod_serv: attribute("ClaveProdServ"),
                    no_identificacion: attribute("NoIdentificacion"),
                    cantidad: attribute("Cantidad"),
                    clave_unidad: attribute("ClaveUnidad"),
                    unidad: attribute("Unidad"),
                    descripcion: attribute("Descripcion"),
                    valor_unitario: attribute("ValorUnitario"),
                    importe: attribute("Importe"),
                    descuento: attribute("Descuento"),
                    objeto_imp: attribute("ObjetoImp"),
                    traslados: taxes("Traslado"),
                    retenciones: taxes("Retencion"),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{samples, CfdiParser};
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_invoice_data() {
        let document = CfdiParser::default().parse(samples::WITH_COMPLEMENTO).unwrap();
        let data = document.extract_data();
        let get = |key: &str| data.get(key).map(String::as_str);
        assert_eq!(get("version"), Some("4.0"));
        assert_eq!(get("folio"), Some("123"));
        assert_eq!(get("total"), Some("500.00"));
        assert_eq!(get("uuid"), Some("ABC-123"));
        assert_eq!(get("fecha_timbrado"), Some("2024-01-31T10:05:00"));
        assert_eq!(get("emisor_rfc"), Some("AAA010101AAA"));
        assert_eq!(get("receptor_uso_cfdi"), Some("G03"));
        assert_eq!(get("concepto_descripcion"), Some("Tornillo"));
        assert_eq!(get("impuestos"), Some("68.97"));
        assert_eq!(get("descuento"), None);
    }

    #[test]
    fn timbre_fallback_scan() {
        // stamp outside of Complemento
        let xml = r#"<cfdi:Comprobante xmlns:cfdi="http://www.sat.gob.mx/cfd/4" Version="4.0">
  <otro:Envoltura xmlns:otro="urn:otro">
    <otro:TimbreFiscalDigital UUID="XYZ-9"/>
  </otro:Envoltura>
</cfdi:Comprobante>"#;
        let document = CfdiParser::default().parse(xml).unwrap();
        assert_eq!(
            document.extract_data().get("uuid").map(String::as_str),
            Some("XYZ-9")
        );
    }

    #[test]
    fn line_items_with_taxes() {
        let document = CfdiParser::default().parse(samples::WITH_COMPLEMENTO).unwrap();
        let items = document.line_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].descripcion.as_deref(), Some("Tornillo"));
        assert_eq!(items[0].traslados.len(), 1);
        assert!(items[0].retenciones.is_empty());
        assert_eq!(items[1].cantidad.as_deref(), Some("2"));
        assert_eq!(items[1].retenciones[0].importe.as_deref(), Some("13.10"));
        assert_eq!(items[1].traslados[0].tasa_o_cuota.as_deref(), Some("0.160000"));
    }

    #[test]
    fn default_namespace_documents_extract_too() {
        let document = CfdiParser::default().parse(samples::DEFAULT_NAMESPACE).unwrap();
        let data = document.extract_data();
        assert_eq!(data.get("uuid").map(String::as_str), Some("DEF-456"));
        assert_eq!(data.get("emisor_rfc").map(String::as_str), Some("AAA010101AAA"));
    }
}
