//! Contract interface schema loaded from a JSON ABI artifact.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::AbiError;

/// Function selector: first four bytes of Keccak-256 of the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// The four contract methods the client calls. Names are case-sensitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElectionMethod {
    GetCandidates,
    CandidateNumber,
    CandidateRegistration,
    Vote,
}

impl ElectionMethod {
    pub const ALL: [ElectionMethod; 4] = [
        Self::GetCandidates,
        Self::CandidateNumber,
        Self::CandidateRegistration,
        Self::Vote,
    ];

    /// Wire name of the method.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetCandidates => "getCandidates",
            Self::CandidateNumber => "candidateNumber",
            Self::CandidateRegistration => "candidateRegistration",
            Self::Vote => "Vote",
        }
    }

    fn function(&self) -> AbiFunction {
        let uint = |name: &str| AbiParam::new(name, "uint256");
        match self {
            Self::GetCandidates => AbiFunction {
                name: self.name().into(),
                kind: "function".into(),
                inputs: vec![],
                outputs: vec![AbiParam {
                    name: String::new(),
                    kind: "tuple[]".into(),
                    components: vec![
                        uint("candidateId"),
                        AbiParam::new("candidateAddress", "address"),
                        uint("votes"),
                    ],
                }],
                state_mutability: "view".into(),
            },
            Self::CandidateNumber => AbiFunction {
                name: self.name().into(),
                kind: "function".into(),
                inputs: vec![],
                outputs: vec![uint("")],
                state_mutability: "view".into(),
            },
            Self::CandidateRegistration => AbiFunction {
                name: self.name().into(),
                kind: "function".into(),
                inputs: vec![],
                outputs: vec![],
                state_mutability: "nonpayable".into(),
            },
            Self::Vote => AbiFunction {
                name: self.name().into(),
                kind: "function".into(),
                inputs: vec![uint("_candidateId")],
                outputs: vec![],
                state_mutability: "nonpayable".into(),
            },
        }
    }
}

/// One input or output parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<AbiParam>,
}

impl AbiParam {
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            components: Vec::new(),
        }
    }

    /// Canonical type string, expanding tuples into `(a,b,...)`.
    pub fn canonical_type(&self) -> String {
        match self.kind.strip_prefix("tuple") {
            Some(suffix) => {
                let inner: Vec<String> =
                    self.components.iter().map(AbiParam::canonical_type).collect();
                format!("({}){}", inner.join(","), suffix)
            }
            None => self.kind.clone(),
        }
    }
}

/// A function entry of the ABI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiFunction {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
    #[serde(default)]
    pub state_mutability: String,
}

impl AbiFunction {
    /// Canonical signature, e.g. `Vote(uint256)`.
    pub fn signature(&self) -> String {
        let inputs: Vec<String> = self.inputs.iter().map(AbiParam::canonical_type).collect();
        format!("{}({})", self.name, inputs.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        selector(&self.signature())
    }

    /// Whether calling this function can change contract state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self.state_mutability.as_str(), "view" | "pure")
    }
}

/// The contract's interface: the function entries of its ABI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractAbi {
    functions: Vec<AbiFunction>,
}

impl ContractAbi {
    /// Built-in schema for the election contract.
    pub fn election() -> Self {
        Self {
            functions: ElectionMethod::ALL.iter().map(ElectionMethod::function).collect(),
        }
    }

    /// Parse a JSON ABI: either a bare entry array or a build artifact with an `abi` field.
    pub fn from_json(json: &str) -> Result<Self, AbiError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| AbiError::Artifact(e.to_string()))?;
        let entries = match value {
            serde_json::Value::Array(entries) => entries,
            serde_json::Value::Object(mut obj) => match obj.remove("abi") {
                Some(serde_json::Value::Array(entries)) => entries,
                _ => return Err(AbiError::Artifact("missing `abi` array".into())),
            },
            _ => return Err(AbiError::Artifact("expected an array or object".into())),
        };

        let mut functions = Vec::new();
        for entry in entries {
            if entry.get("type").and_then(|t| t.as_str()) != Some("function") {
                continue;
            }
            let function: AbiFunction =
                serde_json::from_value(entry).map_err(|e| AbiError::Artifact(e.to_string()))?;
            functions.push(function);
        }
        Ok(Self { functions })
    }

    pub fn functions(&self) -> &[AbiFunction] {
        &self.functions
    }

    /// Look up a function by its case-sensitive name.
    pub fn function(&self, name: &str) -> Result<&AbiFunction, AbiError> {
        self.functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| AbiError::UnknownMethod(name.to_string()))
    }

    /// Fail with the first election method the schema does not declare.
    pub fn require_election_methods(&self) -> Result<(), AbiError> {
        for method in ElectionMethod::ALL {
            self.function(method.name())?;
        }
        Ok(())
    }
}

impl Default for ContractAbi {
    fn default() -> Self {
        Self::election()
    }
}
