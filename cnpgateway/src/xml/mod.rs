//! Document XML en mémoire pour les requêtes cnpOnline
//!
//! Le document est un arbre [`xmltree::Element`] : les éléments gardent
//! l'ordre d'insertion de leurs enfants comme de leurs attributs, ce qui
//! permet de produire exactement la séquence attendue par le schéma.

pub mod cleanup;

use xmltree::{Element, EmitterConfig, XMLNode};

/// Arbre XML d'une requête, de sa construction à sa sérialisation
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    root: Element,
}

impl XmlDocument {
    /// Crée un document dont la racine porte les attributs donnés, dans l'ordre
    pub fn new(root_name: &str, attributes: &[(&str, &str)]) -> Self {
        let mut root = Element::new(root_name);
        for (name, value) in attributes {
            set_attribute(&mut root, name, value);
        }
        Self { root }
    }

    pub fn from_element(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn into_element(self) -> Element {
        self.root
    }

    /// Retrouve un élément par son chemin depuis la racine
    ///
    /// `find(&["transaction", "card", "number"])` ne considère que le premier
    /// enfant de chaque nom.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter()
            .try_fold(&self.root, |element, name| element.get_child(*name))
    }

    /// Texte d'un élément retrouvé par son chemin
    pub fn text_at(&self, path: &[&str]) -> Option<String> {
        self.find(path)
            .and_then(|element| element.get_text())
            .map(|text| text.into_owned())
    }

    /// Sérialise le document sur une seule ligne, avec déclaration XML
    pub fn to_xml_string(&self) -> Result<String, xmltree::Error> {
        self.write(EmitterConfig::new().perform_indent(false))
    }

    /// Sérialise le document indenté, pour l'affichage
    pub fn to_pretty_string(&self) -> Result<String, xmltree::Error> {
        self.write(
            EmitterConfig::new()
                .perform_indent(true)
                .indent_string("  "),
        )
    }

    fn write(&self, config: EmitterConfig) -> Result<String, xmltree::Error> {
        let mut buf = Vec::new();
        self.root
            .write_with_config(&mut buf, config.write_document_declaration(true))?;
        // xml-rs n'émet que de l'UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Ajoute ou remplace un attribut, à la suite des attributs existants
pub(crate) fn set_attribute(element: &mut Element, name: &str, value: &str) {
    element
        .attributes
        .insert(name.to_string(), value.to_string());
}

/// Ajoute un enfant `<name>value</name>`
///
/// Une valeur vide produit un élément sans contenu; il disparaît au
/// nettoyage.
pub(crate) fn add_text_child(parent: &mut Element, name: &str, value: &str) {
    let mut child = Element::new(name);
    if !value.is_empty() {
        child.children.push(XMLNode::Text(value.to_string()));
    }
    parent.children.push(XMLNode::Element(child));
}

pub(crate) fn add_child(parent: &mut Element, child: Element) {
    parent.children.push(XMLNode::Element(child));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_order_is_kept() {
        let doc = XmlDocument::new(
            "cnpOnlineRequest",
            &[
                ("xmlns", "http://www.vantivcnp.com/schema"),
                ("version", "12.1"),
                ("merchantId", "M1"),
            ],
        );
        let xml = doc.to_xml_string().unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(
            r#"<cnpOnlineRequest xmlns="http://www.vantivcnp.com/schema" version="12.1" merchantId="M1""#
        ));
    }

    #[test]
    fn test_text_children_and_find() {
        let mut doc = XmlDocument::new("root", &[]);
        let mut auth = Element::new("authentication");
        add_text_child(&mut auth, "user", "alice");
        add_text_child(&mut auth, "password", "");
        add_child(doc.root_mut(), auth);

        assert_eq!(doc.text_at(&["authentication", "user"]).as_deref(), Some("alice"));
        assert!(doc.find(&["authentication", "password"]).is_some());
        assert_eq!(doc.text_at(&["authentication", "password"]), None);
        assert!(doc.find(&["missing"]).is_none());

        let xml = doc.to_xml_string().unwrap();
        assert!(xml.contains("<user>alice</user>"));
        assert!(!xml.contains('\n'));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut doc = XmlDocument::new("root", &[]);
        add_text_child(doc.root_mut(), "name", "Tom & Jerry <Ltd>");
        let xml = doc.to_xml_string().unwrap();
        assert!(xml.contains("Tom &amp; Jerry &lt;Ltd>") || xml.contains("Tom &amp; Jerry &lt;Ltd&gt;"));
    }
}
