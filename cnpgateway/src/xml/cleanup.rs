//! Suppression des éléments vides avant l'envoi
//!
//! La passerelle rejette les éléments optionnels présents mais vides. Un
//! élément est vide s'il n'a aucun attribut et que tous ses enfants sont du
//! texte blanc. Retirer un élément peut vider son parent : on recommence
//! jusqu'à ce qu'une passe ne retire plus rien. La racine n'est jamais
//! retirée.

use xmltree::{Element, XMLNode};

use super::XmlDocument;

/// Compte rendu d'un nettoyage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    /// Passes ayant retiré au moins un élément
    pub rounds: usize,
    pub removed: usize,
}

/// Retire tous les éléments vides du document
pub fn clean(mut document: XmlDocument) -> XmlDocument {
    let stats = prune_empty_elements(document.root_mut());
    tracing::trace!(
        rounds = stats.rounds,
        removed = stats.removed,
        "Empty elements pruned"
    );
    document
}

/// Nettoie l'arbre sous `root` jusqu'au point fixe
pub fn prune_empty_elements(root: &mut Element) -> PruneStats {
    let mut stats = PruneStats::default();
    loop {
        let removed = prune_pass(root);
        if removed == 0 {
            return stats;
        }
        stats.rounds += 1;
        stats.removed += removed;
    }
}

/// Un élément sans attribut dont le contenu n'est que du blanc
pub fn is_empty_element(element: &Element) -> bool {
    element.attributes.is_empty()
        && element
            .children
            .iter()
            .all(|node| matches!(node, XMLNode::Text(text) if text.trim().is_empty()))
}

// Parcours post-fixe : les enfants sont nettoyés avant d'examiner le parent
fn prune_pass(element: &mut Element) -> usize {
    let mut removed = 0;
    for node in element.children.iter_mut() {
        if let XMLNode::Element(child) = node {
            removed += prune_pass(child);
        }
    }

    let before = element.children.len();
    element
        .children
        .retain(|node| !matches!(node, XMLNode::Element(child) if is_empty_element(child)));
    removed + before - element.children.len()
}
