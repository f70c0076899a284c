use std::{borrow::Cow, path::PathBuf};

use anyhow::{anyhow, Result};
use instance_io::read_instance;
use log::{debug, info, trace};
use mrcpsp::{problem::PrecedenceGraph, ProblemInstance};

use super::Outcome;

pub fn graph(input_path: PathBuf, output_path: PathBuf) -> Result<Outcome> {
    let file = read_instance(&input_path)?;
    trace!("parsed instance: {file:#?}");

    let name = input_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("instance"));
    let problem = ProblemInstance::from_instance_file(&name, &file)?;

    debug!("Creating graph for instance: {name}");

    let edges = Edges::new(&problem)?;

    let mut output_file = std::fs::File::create(output_path.clone())?;
    dot::render(&edges, &mut output_file)?;

    info!("Wrote graphviz dot file to: {:?}", output_path);

    Ok(Outcome::Success)
}

type Nd = usize;
type Ed = (usize, usize);

struct Edges {
    graph_id: dot::Id<'static>,
    node_ids: Vec<dot::Id<'static>>,
    labels: Vec<String>,
    edges: Vec<Ed>,
}

impl Edges {
    fn new(problem: &ProblemInstance) -> Result<Self> {
        let graph_name: String = problem
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let graph_id = dot::Id::new(format!("G_{graph_name}"))
            .map_err(|_| anyhow!("{} is no valid graph id", problem.name))?;

        let node_ids = (0..problem.jobs().len())
            .map(|node| dot::Id::new(format!("N{node}")).map_err(|_| anyhow!("invalid node id N{node}")))
            .collect::<Result<_>>()?;

        // job id with the processing time range of its modes
        let labels = problem
            .jobs()
            .iter()
            .map(|job| {
                let (shortest, longest) = (job.min_processing_time(), job.max_processing_time());
                if shortest == longest {
                    format!("{} ({shortest})", job.id)
                } else {
                    format!("{} ({shortest}..{longest})", job.id)
                }
            })
            .collect();

        Ok(Self {
            graph_id,
            node_ids,
            labels,
            edges: PrecedenceGraph::from_problem(problem).edges().collect(),
        })
    }
}

impl<'a> dot::Labeller<'a, Nd, Ed> for Edges {
    fn graph_id(&'a self) -> dot::Id<'a> {
        dot::Id::new(self.graph_id.as_slice()).expect("validated in Edges::new")
    }

    fn node_id(&'a self, n: &Nd) -> dot::Id<'a> {
        dot::Id::new(self.node_ids[*n].as_slice()).expect("validated in Edges::new")
    }

    fn node_label(&'a self, n: &Nd) -> dot::LabelText<'a> {
        dot::LabelText::label(self.labels[*n].clone())
    }
}

impl<'a> dot::GraphWalk<'a, Nd, Ed> for Edges {
    fn nodes(&self) -> dot::Nodes<'a, Nd> {
        Cow::Owned((0..self.labels.len()).collect())
    }

    fn edges(&'a self) -> dot::Edges<'a, Ed> {
        Cow::Borrowed(&self.edges[..])
    }

    fn source(&self, e: &Ed) -> Nd {
        e.0
    }

    fn target(&self, e: &Ed) -> Nd {
        e.1
    }
}
