use crate::domain::Domain;
use crate::make_error;
use crate::pog::pog::Pog;
use eyre::{Report, WrapErr};
use itertools::Itertools;
use std::collections::BTreeMap;

pub const GAP_CHARS: [char; 2] = ['-', '.'];

pub fn is_gap(c: char) -> bool {
  GAP_CHARS.contains(&c)
}

/// Multiple sequence alignment of extant sequences. Gaps are stored as `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alignment {
  names: Vec<String>,
  rows: Vec<Vec<Option<char>>>,
  index: BTreeMap<String, usize>,
  width: usize,
}

impl Alignment {
  pub fn new<N, Q>(sequences: impl IntoIterator<Item = (N, Q)>) -> Result<Self, Report>
  where
    N: Into<String>,
    Q: AsRef<str>,
  {
    let mut names = vec![];
    let mut rows = vec![];
    let mut index = BTreeMap::new();
    for (name, seq) in sequences {
      let name = name.into();
      let row = seq
        .as_ref()
        .chars()
        .map(|c| (!is_gap(c)).then_some(c.to_ascii_uppercase()))
        .collect_vec();
      if index.insert(name.clone(), rows.len()).is_some() {
        return make_error!("Alignment contains duplicate sequence name '{name}'");
      }
      names.push(name);
      rows.push(row);
    }

    let width = rows.first().map_or(0, Vec::len);
    if let Some((name, row)) = names.iter().zip(&rows).find(|(_, row)| row.len() != width) {
      return make_error!(
        "Sequences of an alignment must be of equal length, but sequence '{name}' has length {}, while {width} was expected",
        row.len()
      );
    }

    Ok(Self {
      names,
      rows,
      index,
      width,
    })
  }

  /// Number of columns
  pub fn width(&self) -> usize {
    self.width
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  pub fn names(&self) -> &[String] {
    &self.names
  }

  pub fn contains(&self, name: &str) -> bool {
    self.index.contains_key(name)
  }

  pub fn row(&self, name: &str) -> Option<&[Option<char>]> {
    self.index.get(name).map(|&i| self.rows[i].as_slice())
  }

  /// Residue of the named sequence at the column, `None` for a gap or an unknown sequence
  pub fn residue(&self, name: &str, column: usize) -> Option<char> {
    self.row(name).and_then(|row| row.get(column).copied().flatten())
  }

  /// Distinct residues occurring anywhere in the alignment, sorted
  pub fn residues(&self) -> Domain<char> {
    Domain::new(self.rows.iter().flatten().flatten().copied().sorted())
  }

  /// Linear POG of the named sequence
  pub fn extant_pog(&self, name: &str) -> Result<Pog, Report> {
    match self.row(name) {
      Some(row) => Pog::from_aligned(name, row).wrap_err_with(|| format!("When building POG of sequence '{name}'")),
      None => make_error!("Sequence '{name}' not found in the alignment"),
    }
  }
}
