//! Restartable view over cached result documents

use std::ops::Index;
use std::slice;

use serde_json::Value;

use crate::session::{CommandResponse, RESULT_KEY};

/// Borrowed view of the documents in a command reply.
///
/// The view is `Copy`: every `iter()` starts again from the first document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Documents<'a> {
    documents: &'a [Value],
}

impl<'a> Documents<'a> {
    /// Extracts the `"result"` array from a reply. A missing key, or a value
    /// that is not an array, yields an empty view.
    pub fn from_response(response: &'a CommandResponse) -> Self {
        let documents = response
            .get(RESULT_KEY)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        Self { documents }
    }

    /// Calls `visitor` once per document, in order
    pub fn each<F>(&self, mut visitor: F)
    where
        F: FnMut(&'a Value),
    {
        for document in self.documents {
            visitor(document);
        }
    }

    /// Fresh iterator from the first document
    pub fn iter(&self) -> slice::Iter<'a, Value> {
        self.documents.iter()
    }

    pub fn as_slice(&self) -> &'a [Value] {
        self.documents
    }

    pub fn get(&self, index: usize) -> Option<&'a Value> {
        self.documents.get(index)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Copies the documents out
    pub fn to_vec(&self) -> Vec<Value> {
        self.documents.to_vec()
    }
}

impl<'a> IntoIterator for Documents<'a> {
    type Item = &'a Value;
    type IntoIter = slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

impl<'a> IntoIterator for &Documents<'a> {
    type Item = &'a Value;
    type IntoIter = slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

impl Index<usize> for Documents<'_> {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.documents[index]
    }
}

impl PartialEq<[Value]> for Documents<'_> {
    fn eq(&self, other: &[Value]) -> bool {
        self.documents == other
    }
}

impl PartialEq<Vec<Value>> for Documents<'_> {
    fn eq(&self, other: &Vec<Value>) -> bool {
        self.documents == other.as_slice()
    }
}
