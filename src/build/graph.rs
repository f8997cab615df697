//! petgraph-based dependency graph over a set of workflow steps.
//!
//! Edges run from the producing step to the consuming step and are
//! labelled with the linked output/input pair.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::{Error, Result};
use crate::model::step::{Source, WorkflowStep};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkLabel {
    pub output_id: String,
    pub input_id: String,
}

pub struct StepGraph {
    pub graph: DiGraph<String, LinkLabel>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl StepGraph {
    /// Build the graph from the steps' `StepOutput` sources.
    ///
    /// Links to steps outside the set, or to outputs a step does not
    /// declare, are errors.
    pub fn build(steps: &[WorkflowStep]) -> Result<StepGraph> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for step in steps {
            let idx = graph.add_node(step.id.clone());
            node_indices.insert(step.id.clone(), idx);
        }

        for step in steps {
            let consumer = node_indices[&step.id];
            for input in &step.inputs {
                let Source::StepOutput(source) = &input.source else {
                    continue;
                };
                let Some(&producer) = node_indices.get(&source.step_id) else {
                    return Err(Error::UnknownSourceStep {
                        step_id: step.id.clone(),
                        input_id: input.id.clone(),
                        source_step: source.step_id.clone(),
                    });
                };
                let declares_output = steps
                    .iter()
                    .find(|other| other.id == source.step_id)
                    .is_some_and(|other| other.output(&source.output_id).is_some());
                if !declares_output {
                    return Err(Error::UnknownStepOutput {
                        step_id: source.step_id.clone(),
                        io_id: source.output_id.clone(),
                    });
                }
                graph.add_edge(
                    producer,
                    consumer,
                    LinkLabel {
                        output_id: source.output_id.clone(),
                        input_id: input.id.clone(),
                    },
                );
            }
        }

        Ok(StepGraph {
            graph,
            node_indices,
        })
    }

    /// Error out if the links form a cycle.
    pub fn ensure_acyclic(&self) -> Result<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(Error::DependencyCycle(
                self.graph[cycle.node_id()].clone(),
            )),
        }
    }

    /// The `(consumer step, input id)` pairs linked to one step output.
    pub fn consumers(&self, step_id: &str, output_id: &str) -> Vec<(&str, &str)> {
        let Some(&idx) = self.node_indices.get(step_id) else {
            return vec![];
        };
        self.graph
            .edges(idx)
            .filter(|edge| edge.weight().output_id == output_id)
            .map(|edge| {
                (
                    self.graph[edge.target()].as_str(),
                    edge.weight().input_id.as_str(),
                )
            })
            .collect()
    }
}
