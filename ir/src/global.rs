use crate::types::Type;

/// Linkage, to the extent the core passes care about it: enough to tell
/// a declaration from a definition and to mark synthesized globals/functions
/// as module-private.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Linkage {
    External,
    Internal,
    Private,
}

/// The content of a global's initializer, or of an inline constant operand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstantData {
    Int { ty: Type, value: i64 },
    /// A byte array recognizable as a (possibly null-terminated) string.
    CString { bytes: Vec<u8>, nul_terminated: bool },
    Bytes(Vec<u8>),
}

impl ConstantData {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ConstantData::Int { .. } => &[],
            ConstantData::CString { bytes, .. } => bytes,
            ConstantData::Bytes(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
pub struct GlobalVariable {
    pub name: String,
    pub is_constant: bool,
    pub linkage: Linkage,
    pub initializer: Option<crate::ConstantId>,
}
