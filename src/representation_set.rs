use crate::error::{HalError, Result};
use crate::representation::Representation;
use crate::transport::{Headers, PostResponse};
use std::ops::Index;

/// Ordered result of a relation lookup. Single- and multi-valued relations
/// both come back as a set.
#[derive(Debug, Clone, Default)]
pub struct RepresentationSet {
    members: Vec<Representation>,
}

impl RepresentationSet {
    pub fn new(members: Vec<Representation>) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Representation> {
        self.members.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Representation> {
        self.members.get(index)
    }

    pub fn first(&self) -> Option<&Representation> {
        self.members.first()
    }

    /// `self` hrefs of the members; members without one are skipped.
    pub fn hrefs(&self) -> Vec<&str> {
        self.members.iter().filter_map(Representation::href).collect()
    }

    pub fn contains_href(&self, href: &str) -> bool {
        self.find_by_href(href).is_some()
    }

    pub fn find_by_href(&self, href: &str) -> Option<&Representation> {
        self.members.iter().find(|r| r.href() == Some(href))
    }

    pub fn into_vec(self) -> Vec<Representation> {
        self.members
    }

    /// The sole member; `NotSingular` when the set holds zero or several.
    pub fn single(&self) -> Result<&Representation> {
        match self.members.as_slice() {
            [only] => Ok(only),
            members => Err(HalError::NotSingular(members.len())),
        }
    }

    /// POST to the sole member of a single-valued relation.
    pub async fn post(&self, body: impl Into<String>, headers: &Headers) -> Result<PostResponse> {
        self.single()?.post(body, headers).await
    }
}

impl Index<usize> for RepresentationSet {
    type Output = Representation;

    fn index(&self, index: usize) -> &Self::Output {
        &self.members[index]
    }
}

impl IntoIterator for RepresentationSet {
    type Item = Representation;
    type IntoIter = std::vec::IntoIter<Representation>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

impl<'a> IntoIterator for &'a RepresentationSet {
    type Item = &'a Representation;
    type IntoIter = std::slice::Iter<'a, Representation>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

impl FromIterator<Representation> for RepresentationSet {
    fn from_iter<I: IntoIterator<Item = Representation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl From<Vec<Representation>> for RepresentationSet {
    fn from(members: Vec<Representation>) -> Self {
        Self::new(members)
    }
}
