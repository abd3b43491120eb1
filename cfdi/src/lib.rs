//! Structural access to signed CFDI 4.0 documents: hardened parsing, invoice data extraction and
//! insertion of an addenda fragment at the position the CFDI schema mandates.

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod insert;
pub mod structure;

pub use config::{NamespaceConfig, ParserConfig, CFDI_4_NAMESPACE, TFD_NAMESPACE};
pub use document::{CfdiDocument, CfdiParser};
pub use error::CfdiError;
pub use extract::{LineItem, Tax};
pub use insert::InsertionPoint;
pub use structure::StructureViolation;

#[cfg(test)]
pub(crate) mod samples {
    pub const WITH_COMPLEMENTO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cfdi:Comprobante xmlns:cfdi="http://www.sat.gob.mx/cfd/4" xmlns:tfd="http://www.sat.gob.mx/TimbreFiscalDigital" Version="4.0" Serie="A" Folio="123" Fecha="2024-01-31T10:00:00" FormaPago="99" MetodoPago="PPD" Moneda="MXN" SubTotal="431.03" Total="500.00" TipoDeComprobante="I" LugarExpedicion="64000" Exportacion="01">
  <cfdi:Emisor Rfc="AAA010101AAA" Nombre="EMPRESA DEMO" RegimenFiscal="601"/>
  <cfdi:Receptor Rfc="XAXX010101000" Nombre="CLIENTE DEMO" UsoCFDI="G03" DomicilioFiscalReceptor="64000" RegimenFiscalReceptor="616"/>
  <cfdi:Conceptos>
    <cfdi:Concepto ClaveProdServ="01010101" Cantidad="1" ClaveUnidad="H87" Descripcion="Tornillo" ValorUnitario="300.00" Importe="300.00" ObjetoImp="02">
      <cfdi:Impuestos>
        <cfdi:Traslados>
          <cfdi:Traslado Base="300.00" Impuesto="002" TipoFactor="Tasa" TasaOCuota="0.160000" Importe="48.00"/>
        </cfdi:Traslados>
      </cfdi:Impuestos>
    </cfdi:Concepto>
    <cfdi:Concepto ClaveProdServ="01010101" Cantidad="2" ClaveUnidad="H87" Descripcion="Tuerca" ValorUnitario="65.515" Importe="131.03" ObjetoImp="02">
      <cfdi:Impuestos>
        <cfdi:Traslados>
          <cfdi:Traslado Base="131.03" Impuesto="002" TipoFactor="Tasa" TasaOCuota="0.160000" Importe="20.97"/>
        </cfdi:Traslados>
        <cfdi:Retenciones>
          <cfdi:Retencion Base="131.03" Impuesto="001" TipoFactor="Tasa" TasaOCuota="0.100000" Importe="13.10"/>
        </cfdi:Retenciones>
      </cfdi:Impuestos>
    </cfdi:Concepto>
  </cfdi:Conceptos>
  <cfdi:Impuestos TotalImpuestosTrasladados="68.97"/>
  <cfdi:Complemento>
    <tfd:TimbreFiscalDigital Version="1.1" UUID="ABC-123" FechaTimbrado="2024-01-31T10:05:00"/>
  </cfdi:Complemento>
</cfdi:Comprobante>
"#;

    pub const WITHOUT_COMPLEMENTO: &str = r#"<cfdi:Comprobante xmlns:cfdi="http://www.sat.gob.mx/cfd/4" Version="4.0" Total="100.00">
  <cfdi:Emisor Rfc="AAA010101AAA"/>
  <cfdi:Receptor Rfc="XAXX010101000"/>
  <cfdi:Conceptos>
    <cfdi:Concepto Descripcion="Servicio" Importe="100.00"/>
  </cfdi:Conceptos>
  <cfdi:Impuestos TotalImpuestosTrasladados="16.00"/>
</cfdi:Comprobante>"#;

    pub const MINIMAL: &str = r#"<cfdi:Comprobante xmlns:cfdi="http://www.sat.gob.mx/cfd/4" Version="4.0">
  <cfdi:Emisor Rfc="AAA010101AAA"/>
  <cfdi:Receptor Rfc="XAXX010101000"/>
</cfdi:Comprobante>"#;

    pub const DEFAULT_NAMESPACE: &str = r#"<Comprobante xmlns="http://www.sat.gob.mx/cfd/4" Version="4.0">
  <Emisor Rfc="AAA010101AAA"/>
  <Receptor Rfc="XAXX010101000"/>
  <Conceptos><Concepto Descripcion="Servicio"/></Conceptos>
  <Complemento>
    <tfd:TimbreFiscalDigital xmlns:tfd="http://www.sat.gob.mx/TimbreFiscalDigital" UUID="DEF-456"/>
  </Complemento>
</Comprobante>"#;
}
