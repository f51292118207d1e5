use std::{collections::BTreeMap, str::FromStr};

use strum::{Display, EnumString};

use crate::{
    error::Result,
    protos::peer::{chaincode_spec, ChaincodeId},
    FabricSdkError,
};

/// Language a chaincode is written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ChaincodeLanguage {
    #[default]
    #[strum(serialize = "golang", serialize = "go")]
    GoLang,
    #[strum(serialize = "java")]
    Java,
    #[strum(serialize = "node")]
    Node,
}

impl ChaincodeLanguage {
    /// Parse a language name, rejecting languages the network cannot run.
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_str(name).map_err(|_| {
            FabricSdkError::InvalidArgument(format!(
                "Requested chaincode type is not supported: {name}"
            ))
        })
    }

    pub fn chaincode_type(&self) -> chaincode_spec::Type {
        match self {
            ChaincodeLanguage::GoLang => chaincode_spec::Type::Golang,
            ChaincodeLanguage::Java => chaincode_spec::Type::Java,
            ChaincodeLanguage::Node => chaincode_spec::Type::Node,
        }
    }
}

/// A request to invoke or query a chaincode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionRequest {
    pub chaincode_id: Option<ChaincodeId>,
    pub chaincode_language: ChaincodeLanguage,
    pub function_name: String,
    pub args: Vec<String>,
    pub args_bytes: Vec<Vec<u8>>,
    pub transient_map: BTreeMap<String, Vec<u8>>,
    /// Target no particular channel (system scope).
    pub no_channel_id: bool,
}

impl TransactionRequest {
    pub fn new(chaincode_id: ChaincodeId, function_name: impl Into<String>) -> Self {
        Self {
            chaincode_id: Some(chaincode_id),
            function_name: function_name.into(),
            ..Default::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_args_bytes(mut self, args: Vec<Vec<u8>>) -> Self {
        self.args_bytes = args;
        self
    }

    pub fn with_language(mut self, language: ChaincodeLanguage) -> Self {
        self.chaincode_language = language;
        self
    }

    pub fn with_transient_map(mut self, transient_map: BTreeMap<String, Vec<u8>>) -> Self {
        self.transient_map = transient_map;
        self
    }

    pub fn without_channel(mut self) -> Self {
        self.no_channel_id = true;
        self
    }

    /// Arguments in wire order: function name, then string args, then raw
    /// byte args.
    pub(crate) fn wire_args(&self) -> Vec<Vec<u8>> {
        std::iter::once(self.function_name.as_bytes().to_vec())
            .chain(self.args.iter().map(|arg| arg.as_bytes().to_vec()))
            .chain(self.args_bytes.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_names_parse() {
        assert_eq!(ChaincodeLanguage::parse("GoLang").unwrap(), ChaincodeLanguage::GoLang);
        assert_eq!(ChaincodeLanguage::parse("go").unwrap(), ChaincodeLanguage::GoLang);
        assert_eq!(ChaincodeLanguage::parse("JAVA").unwrap(), ChaincodeLanguage::Java);
        assert_eq!(ChaincodeLanguage::parse("node").unwrap(), ChaincodeLanguage::Node);
    }

    #[test]
    fn unsupported_language_is_invalid_argument() {
        let error = ChaincodeLanguage::parse("cobol").unwrap_err();
        assert!(matches!(error, FabricSdkError::InvalidArgument(message)
            if message.contains("Requested chaincode type is not supported")));
    }

    #[test]
    fn wire_args_put_function_first() {
        let request = TransactionRequest::new(ChaincodeId::new("mycc", "1.0"), "move")
            .with_args(["a", "b"])
            .with_args_bytes(vec![vec![0xff]]);

        assert_eq!(
            request.wire_args(),
            vec![b"move".to_vec(), b"a".to_vec(), b"b".to_vec(), vec![0xff]]
        );
    }
}
