//! Explicit registry of structure views linked to genome views.
//!
//! Owned by the host and passed to whichever component needs cross-view
//! lookups; nothing here is global.

use crate::resolver::{HoverTarget, StructureTranscriptLink};
use crosswalk_protocol::HoverState;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct LinkedViews {
    pub structure_view_id: String,
    pub genome_view_id: String,
    /// Set once a transcript has been selected and the link computed.
    pub link: Option<Arc<StructureTranscriptLink>>,
}

#[derive(Debug, Default)]
pub struct ViewLinkRegistry {
    by_structure_view: HashMap<String, LinkedViews>,
}

impl ViewLinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `views` under its structure view id, returning any entry it
    /// replaced.
    pub fn register(&mut self, views: LinkedViews) -> Option<LinkedViews> {
        log::debug!(
            "linking structure view '{}' to genome view '{}'",
            views.structure_view_id,
            views.genome_view_id
        );
        self.by_structure_view
            .insert(views.structure_view_id.clone(), views)
    }

    pub fn unregister(&mut self, structure_view_id: &str) -> Option<LinkedViews> {
        let removed = self.by_structure_view.remove(structure_view_id);
        if removed.is_some() {
            log::debug!("unlinked structure view '{structure_view_id}'");
        }
        removed
    }

    pub fn get(&self, structure_view_id: &str) -> Option<&LinkedViews> {
        self.by_structure_view.get(structure_view_id)
    }

    /// Replaces the computed link of a registered view. Returns false when
    /// the view is unknown.
    pub fn set_link(&mut self, structure_view_id: &str, link: Option<Arc<StructureTranscriptLink>>) -> bool {
        match self.by_structure_view.get_mut(structure_view_id) {
            Some(views) => {
                views.link = link;
                true
            }
            None => false,
        }
    }

    /// Structure views attached to `genome_view_id`, sorted by id.
    pub fn structure_views_for(&self, genome_view_id: &str) -> Vec<&LinkedViews> {
        let mut views: Vec<&LinkedViews> = self
            .by_structure_view
            .values()
            .filter(|v| v.genome_view_id == genome_view_id)
            .collect();
        views.sort_by(|a, b| a.structure_view_id.cmp(&b.structure_view_id));
        views
    }

    /// Fans a genome-view hover out to every linked structure view that has
    /// a mapped residue for it.
    pub fn resolve_genome_hover(
        &self,
        genome_view_id: &str,
        hover: &HoverState,
    ) -> Vec<(String, usize)> {
        self.structure_views_for(genome_view_id)
            .into_iter()
            .filter_map(|views| {
                let link = views.link.as_ref()?;
                match link.resolve_hover(hover) {
                    HoverTarget::StructureResidue { residue } => {
                        Some((views.structure_view_id.clone(), residue))
                    }
                    _ => None,
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_structure_view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_structure_view.is_empty()
    }
}
