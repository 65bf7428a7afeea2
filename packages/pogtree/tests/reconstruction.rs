use eyre::Report;
use pogtree::alignment::alignment::Alignment;
use pogtree::domain::Domain;
use pogtree::indel::predict::IndelMethod;
use pogtree::model::f81::F81;
use pogtree::pog::consensus::PathSearch;
use pogtree::reconstruction::params::ReconstructionParams;
use pogtree::reconstruction::reconstruction::{ConsensusMode, Reconstruction};
use pogtree::tree::indexed_tree::IndexedTree;
use pogtree::tree::tree_builder::TreeBuilder;
use pogtree::utils::error::{find_asr_error, AsrError};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;

const SEQUENCES: [(&str, &str); 5] = [
  ("S1", "MKV-LAG--W"),
  ("S2", "MKV-LAGQ-W"),
  ("S3", "MRVPL-G--W"),
  ("S4", "M-VPL-GQEW"),
  ("S5", "MKVPLAG--W"),
];

/// (((S1:0.1,S2:0.1)N2:0.05,S3:0.2)N1:0.1,(S4:0.15,S5:0.1)N3:0.1)N0;
fn tree() -> Result<Arc<IndexedTree>, Report> {
  let mut builder = TreeBuilder::new();
  let n0 = builder.add_node("N0", 0.0);
  let n1 = builder.add_node("N1", 0.1);
  let n2 = builder.add_node("N2", 0.05);
  let n3 = builder.add_node("N3", 0.1);
  let s1 = builder.add_node("S1", 0.1);
  let s2 = builder.add_node("S2", 0.1);
  let s3 = builder.add_node("S3", 0.2);
  let s4 = builder.add_node("S4", 0.15);
  let s5 = builder.add_node("S5", 0.1);
  for (parent, child) in [(n0, n1), (n0, n3), (n1, n2), (n1, s3), (n2, s1), (n2, s2), (n3, s4), (n3, s5)] {
    builder.add_edge(parent, child)?;
  }
  Ok(Arc::new(builder.build()?))
}

fn reconstruction(params: ReconstructionParams) -> Result<Reconstruction, Report> {
  Reconstruction::new(tree()?, Alignment::new(SEQUENCES)?, params)
}

fn model(alignment: &Alignment) -> Result<F81<char>, Report> {
  F81::uniform(alignment.residues(), 1.0)
}

fn residue_model() -> Result<F81<char>, Report> {
  model(&Alignment::new(SEQUENCES)?)
}

#[rstest]
#[case(IndelMethod::PositionSpecificParsimony)]
#[case(IndelMethod::PositionSpecificMaxLikelihood)]
#[case(IndelMethod::SimpleIndelCodingParsimony)]
#[case(IndelMethod::SimpleIndelCodingMaxLikelihood)]
#[case(IndelMethod::BidirectionalEdgeParsimony)]
#[case(IndelMethod::BidirectionalEdgeMaxLikelihood)]
fn every_ancestor_pog_is_contiguous(#[case] indel_method: IndelMethod) -> Result<(), Report> {
  let mut rec = reconstruction(ReconstructionParams {
    indel_method,
    jobs: 2,
    ..ReconstructionParams::default()
  })?;
  rec.infer_indels()?;
  for ancestor in ["N0", "N1", "N2", "N3"] {
    let pog = rec.ancestor_pog(ancestor)?;
    assert!(pog.is_contiguous(), "{pog}");
  }
  Ok(())
}

#[rstest]
#[case(PathSearch::Dijkstra)]
#[case(PathSearch::AStar)]
fn consensus_sequence_is_idempotent(#[case] path_search: PathSearch) -> Result<(), Report> {
  let mut rec = reconstruction(ReconstructionParams {
    path_search,
    jobs: 2,
    ..ReconstructionParams::default()
  })?;
  rec.joint_reconstruct(&residue_model()?, None)?;
  for ancestor in ["N0", "N1", "N2", "N3"] {
    let first = rec.consensus_sequence(ancestor, ConsensusMode::Joint, true)?;
    let second = rec.consensus_sequence(ancestor, ConsensusMode::Joint, true)?;
    assert_eq!(first, second);
    assert_eq!(SEQUENCES[0].1.len(), first.len());
    let ungapped = rec.consensus_sequence(ancestor, ConsensusMode::Joint, false)?;
    assert_eq!(first.replace('-', ""), ungapped);
  }
  Ok(())
}

#[test]
fn consensus_of_closely_related_pair() -> Result<(), Report> {
  let mut rec = reconstruction(ReconstructionParams {
    jobs: 2,
    ..ReconstructionParams::default()
  })?;
  rec.joint_reconstruct(&residue_model()?, None)?;
  // S1 and S2 differ by the Q insertion only
  let consensus = rec.consensus_sequence("N2", ConsensusMode::Joint, true)?;
  assert!(consensus == "MKV-LAG--W" || consensus == "MKV-LAGQ-W", "{consensus}");
  Ok(())
}

#[rstest]
#[case(1)]
#[case(4)]
fn joint_and_marginal_agree_on_conserved_columns(#[case] jobs: usize) -> Result<(), Report> {
  let mut rec = reconstruction(ReconstructionParams {
    jobs,
    ..ReconstructionParams::default()
  })?;
  let model = residue_model()?;
  rec.joint_reconstruct(&model, None)?;
  rec.marginal_reconstruct("N0", &model, None)?;
  let joint = rec.consensus_sequence("N0", ConsensusMode::Joint, true)?;
  let marginal = rec.consensus_sequence("N0", ConsensusMode::Marginal, true)?;
  for column in [0, 2, 6, 9] {
    assert_eq!(joint.chars().nth(column), marginal.chars().nth(column));
  }
  assert_eq!(Some('M'), rec.joint_state("N0", 0)?);
  assert_eq!(Some('K'), rec.joint_state("N0", 1)?);
  Ok(())
}

#[test]
fn results_do_not_depend_on_thread_count() -> Result<(), Report> {
  let consensus = |jobs: usize| -> Result<Vec<String>, Report> {
    let mut rec = reconstruction(ReconstructionParams {
      jobs,
      ..ReconstructionParams::default()
    })?;
    rec.joint_reconstruct(&residue_model()?, None)?;
    ["N0", "N1", "N2", "N3"]
      .into_iter()
      .map(|ancestor| rec.consensus_sequence(ancestor, ConsensusMode::Joint, true))
      .collect()
  };
  assert_eq!(consensus(1)?, consensus(8)?);
  Ok(())
}

#[test]
fn unknown_ancestor_is_reported() -> Result<(), Report> {
  let mut rec = reconstruction(ReconstructionParams::default())?;
  rec.joint_reconstruct(&residue_model()?, None)?;
  for label in ["S1", "N9"] {
    let report = rec.consensus_sequence(label, ConsensusMode::Joint, false).unwrap_err();
    assert_eq!(Some(&AsrError::UnknownAncestor(label.to_owned())), find_asr_error(&report));
  }
  Ok(())
}

#[test]
fn model_domain_restricts_observations() -> Result<(), Report> {
  let mut rec = reconstruction(ReconstructionParams::default())?;
  // Only M and W are known to this model, everything else is unobserved
  rec.joint_reconstruct(&F81::uniform(Domain::new(['M', 'W']), 1.0)?, None)?;
  assert_eq!(Some('M'), rec.joint_state("N1", 0)?);
  assert_eq!(None, rec.joint_state("N1", 1)?);
  let consensus = rec.consensus_sequence("N1", ConsensusMode::Joint, false)?;
  assert!(consensus.starts_with('M') && consensus.ends_with('W'), "{consensus}");
  assert!(consensus.contains('?'), "{consensus}");
  Ok(())
}
