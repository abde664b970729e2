//! Trust trees: every way a record connects to keys further up a data
//! chain, with the verification status of each connection.
//!
//! Nodes live in one arena and refer to their parents by index. A record
//! of a chain link is derived once per tree, however many children reach it.

use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

use super::chain::DataChain;
use super::denial::{denial_marks_zone_cut, verify_denial, verify_denial_nsec3};
use super::digest::ds_equivalent;
use super::verify::{verify, verify_rrsig};
use crate::dns::enums::DNSResourceType;
use crate::dns::resource::{DNSResource, DNSResourceData};
use crate::error::{DnsSecError, Result};

#[derive(Debug, Clone)]
pub struct TrustNode {
    /// `None` when the chain link had no data
    pub rr: Option<DNSResource>,
    pub rrset: Vec<DNSResource>,
    pub parents: Vec<TrustEdge>,
}

#[derive(Debug, Clone)]
pub struct TrustEdge {
    /// Arena index of the parent node
    pub node: usize,
    /// The signature connecting child to parent, if any
    pub signature: Option<DNSResource>,
    pub status: std::result::Result<(), DnsSecError>,
}

/// Outcome of a successful trust search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustVerdict {
    /// An unbroken path of valid edges reaches a trusted key
    Secure,
    /// The path runs through authenticated NSEC or NSEC3 records
    ExistenceDenied,
}

#[derive(Debug, Clone)]
pub struct TrustTree {
    nodes: Vec<TrustNode>,
}

impl TrustTree {
    /// Derive the tree for `rr` (or the first record of the chain's first
    /// link) from `chain`.
    pub fn derive(
        chain: &DataChain,
        rr: Option<&DNSResource>,
        now: u32,
        max_depth: usize,
    ) -> Result<TrustTree> {
        let mut builder = TreeBuilder {
            nodes: Vec::new(),
            derived: HashMap::new(),
            leaves: HashMap::new(),
            now,
            max_depth,
        };
        builder.derive_node(chain, rr, 0)?;
        debug!("Derived trust tree with {} nodes", builder.nodes.len());
        Ok(TrustTree { nodes: builder.nodes })
    }

    pub fn root(&self) -> &TrustNode {
        &self.nodes[0]
    }

    pub fn node(&self, index: usize) -> Option<&TrustNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Arena under construction. Chain links sit at a fixed depth, so a
/// (depth, record) pair names one node of the tree.
struct TreeBuilder {
    nodes: Vec<TrustNode>,
    derived: HashMap<(usize, DNSResource), usize>,
    /// Sibling keys stay leaves so a DNSKEY set cannot loop onto itself
    leaves: HashMap<(usize, DNSResource), usize>,
    now: u32,
    max_depth: usize,
}

impl TreeBuilder {
    fn push(&mut self, rr: Option<DNSResource>, rrset: Vec<DNSResource>) -> usize {
        self.nodes.push(TrustNode {
            rr,
            rrset,
            parents: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn derive_node(
        &mut self,
        chain: &DataChain,
        rr: Option<&DNSResource>,
        depth: usize,
    ) -> Result<usize> {
        if depth > self.max_depth {
            return Err(DnsSecError::RecursionLimit(self.max_depth));
        }

        let current = rr.cloned().or_else(|| chain.rrset.first().cloned());
        let Some(current) = current else {
            return Ok(self.push(None, chain.rrset.clone()));
        };
        if let Some(&index) = self.derived.get(&(depth, current.clone())) {
            trace!("{} {} already derived at depth {}", current.name, current.rtype(), depth);
            return Ok(index);
        }
        let index = self.push(Some(current.clone()), chain.rrset.clone());
        self.derived.insert((depth, current.clone()), index);

        if chain.signatures.is_empty() {
            self.add_unsigned_parents(index, chain, &current, depth)?;
            return Ok(index);
        }

        for sig in &chain.signatures {
            if sig.as_rrsig().is_none() {
                continue;
            }
            self.add_signed_parents(index, chain, sig, depth)?;
            if current.rtype() == DNSResourceType::DNSKEY {
                self.add_sibling_keys(index, chain, &current, sig, depth);
            }
        }
        self.add_ds_parents(index, chain, &current, depth)?;
        Ok(index)
    }

    /// Keys of the parent link whose tag matches `sig`
    fn add_signed_parents(
        &mut self,
        index: usize,
        chain: &DataChain,
        sig: &DNSResource,
        depth: usize,
    ) -> Result<()> {
        let Some(parent) = &chain.parent else {
            return Ok(());
        };
        let Some(rrsig) = sig.as_rrsig() else {
            return Ok(());
        };

        // a denial link holds records of several owners; each signature
        // covers only its own
        let rrset: Vec<DNSResource> = if rrsig.type_covered.is_denial() {
            chain
                .rrset
                .iter()
                .filter(|rr| rr.name == sig.name)
                .cloned()
                .collect()
        } else {
            chain.rrset.clone()
        };

        for key in &parent.rrset {
            let Some(dnskey) = key.as_dnskey() else {
                continue;
            };
            if dnskey.key_tag() != rrsig.key_tag {
                continue;
            }

            let status = verify_rrsig(&rrset, sig, key, self.now);
            trace!("Edge {} -> key {}: {:?}", sig.name, dnskey.key_tag(), status);

            let parent_index = self.derive_node(parent, Some(key), depth + 1)?;
            self.nodes[index].parents.push(TrustEdge {
                node: parent_index,
                signature: Some(sig.clone()),
                status,
            });
        }
        Ok(())
    }

    /// Other keys of the same DNSKEY set that signed it
    fn add_sibling_keys(
        &mut self,
        index: usize,
        chain: &DataChain,
        current: &DNSResource,
        sig: &DNSResource,
        depth: usize,
    ) {
        let Some(rrsig) = sig.as_rrsig() else {
            return;
        };
        for key in &chain.rrset {
            let Some(dnskey) = key.as_dnskey() else {
                continue;
            };
            if dnskey.key_tag() != rrsig.key_tag || key.is_duplicate_of(current) {
                continue;
            }
            let status = verify_rrsig(&chain.rrset, sig, key, self.now);
            let leaf = match self.leaves.get(&(depth, key.clone())) {
                Some(&leaf) => leaf,
                None => {
                    let leaf = self.push(Some(key.clone()), chain.rrset.clone());
                    self.leaves.insert((depth, key.clone()), leaf);
                    leaf
                }
            };
            self.nodes[index].parents.push(TrustEdge {
                node: leaf,
                signature: Some(sig.clone()),
                status,
            });
        }
    }

    /// DS records of the parent link vouching for a key of this DNSKEY set.
    ///
    /// When the DS names another key of the set, the edge only holds if
    /// that key signed the set.
    fn add_ds_parents(
        &mut self,
        index: usize,
        chain: &DataChain,
        current: &DNSResource,
        depth: usize,
    ) -> Result<()> {
        if current.rtype() != DNSResourceType::DNSKEY {
            return Ok(());
        }
        let Some(parent) = &chain.parent else {
            return Ok(());
        };

        for ds in parent.rrset.iter().filter(|rr| rr.rtype() == DNSResourceType::DS) {
            let Some(key) = chain.rrset.iter().find(|key| ds_equivalent(key, ds)) else {
                continue;
            };
            let status = if key.is_duplicate_of(current) {
                Ok(())
            } else {
                verify(
                    &chain.rrset,
                    &chain.signatures,
                    std::slice::from_ref(key),
                    self.now,
                    None,
                )
            };
            let parent_index = self.derive_node(parent, Some(ds), depth + 1)?;
            self.nodes[index].parents.push(TrustEdge {
                node: parent_index,
                signature: None,
                status,
            });
        }
        Ok(())
    }

    /// No signatures: every record of the parent link becomes a parent,
    /// with the outcome of the denial of existence check on the edge.
    fn add_unsigned_parents(
        &mut self,
        index: usize,
        chain: &DataChain,
        current: &DNSResource,
        depth: usize,
    ) -> Result<()> {
        let Some(parent) = &chain.parent else {
            return Ok(());
        };
        let Some(first) = parent.rrset.first() else {
            return Ok(());
        };

        // unsigned data below a cut is proven by the absence of DS there
        let below_cut = parent.packet_qtype == DNSResourceType::DS;
        let (qname, qtype, rcode, nodata) = if below_cut {
            let qname = parent.packet_qname.as_ref().unwrap_or(&current.name);
            (qname, DNSResourceType::DS, parent.packet_rcode, true)
        } else {
            (&current.name, current.rtype(), chain.packet_rcode, chain.packet_nodata)
        };

        let mut status = match first.rtype() {
            DNSResourceType::NSEC3 => verify_denial_nsec3(qname, &parent.rrset, rcode, qtype, nodata),
            DNSResourceType::NSEC => verify_denial(qname, qtype, &parent.rrset, &parent.signatures),
            _ => Ok(()),
        };
        if status.is_ok()
            && below_cut
            && first.rtype().is_denial()
            && !denial_marks_zone_cut(qname, &parent.rrset)
        {
            status = Err(DnsSecError::NotZoneCut(qname.to_string()));
        }
        debug!("Unsigned {} {}: {:?}", qname, qtype, status);

        for rr in &parent.rrset {
            let parent_index = self.derive_node(parent, Some(rr), depth + 1)?;
            self.nodes[index].parents.push(TrustEdge {
                node: parent_index,
                signature: None,
                status: status.clone(),
            });
        }
        Ok(())
    }
}

impl TrustTree {
    /// Longest path from the root to a leaf, counted in nodes
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        self.depth_from(0)
    }

    fn depth_from(&self, index: usize) -> usize {
        1 + self.nodes[index]
            .parents
            .iter()
            .map(|edge| self.depth_from(edge.node))
            .max()
            .unwrap_or(0)
    }

    /// Search for a path of valid edges from the root to one of `trusted`
    /// (DNSKEY or DS records).
    ///
    /// Any valid path wins. Otherwise the first failing edge status on a
    /// path that did reach a trusted key is returned, or `NoDnskey` when
    /// no path reaches one.
    pub fn contains_keys(&self, trusted: &[DNSResource]) -> Result<TrustVerdict> {
        if trusted.is_empty() {
            return Err(DnsSecError::EmptyInput);
        }
        if self.nodes.is_empty() {
            return Err(DnsSecError::NoDnskey);
        }
        self.contains_from(0, trusted)
    }

    fn contains_from(&self, index: usize, trusted: &[DNSResource]) -> Result<TrustVerdict> {
        let node = &self.nodes[index];
        if let Some(rr) = &node.rr {
            if trusted.iter().any(|key| ds_equivalent(rr, key)) {
                trace!("{} {} is trusted", rr.name, rr.rtype());
                return Ok(TrustVerdict::Secure);
            }
        }

        let denial_node = node.rr.as_ref().is_some_and(|rr| rr.rtype().is_denial());
        let mut failure = None;
        for edge in &node.parents {
            let parent_result = self.contains_from(edge.node, trusted);
            if parent_result == Err(DnsSecError::NoDnskey) {
                continue;
            }
            if let Err(e) = &edge.status {
                failure.get_or_insert_with(|| e.clone());
                continue;
            }
            match parent_result {
                Ok(_) if denial_node => return Ok(TrustVerdict::ExistenceDenied),
                Ok(verdict) => return Ok(verdict),
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        Err(failure.unwrap_or(DnsSecError::NoDnskey))
    }

    /// Render the tree, leaves indented under their children. With
    /// `extended`, failing edges also show the signature, RRset and key
    /// involved.
    pub fn print<W: fmt::Write>(&self, out: &mut W, extended: bool) -> fmt::Result {
        if self.nodes.is_empty() {
            return writeln!(out, "<no data>");
        }
        let mut siblings = Vec::new();
        self.print_node(out, 0, 0, extended, &mut siblings)
    }

    fn print_node<W: fmt::Write>(
        &self,
        out: &mut W,
        index: usize,
        tabs: usize,
        extended: bool,
        siblings: &mut Vec<bool>,
    ) -> fmt::Result {
        let node = &self.nodes[index];
        print_tabs(out, tabs, siblings)?;
        let Some(rr) = &node.rr else {
            return writeln!(out, "<no data>");
        };

        write!(out, "{} ({}", rr.name, rr.rtype())?;
        match &rr.rdata {
            DNSResourceData::DNSKEY(key) => write!(out, " keytag: {}", key.key_tag())?,
            DNSResourceData::DS(ds) => write!(out, " keytag: {}", ds.key_tag)?,
            DNSResourceData::NSEC(nsec) => write!(out, " {} -> {}", rr.name, nsec.next_name)?,
            _ => {}
        }
        writeln!(out, ")")?;

        if siblings.len() <= tabs {
            siblings.resize(tabs + 1, false);
        }
        for (i, edge) in node.parents.iter().enumerate() {
            siblings[tabs] = i + 1 < node.parents.len();
            let parent_is_denial = self.nodes[edge.node]
                .rr
                .as_ref()
                .is_some_and(|p| p.rtype().is_denial());

            if parent_is_denial {
                print_tabs(out, tabs + 1, siblings)?;
                match &edge.status {
                    Ok(()) => writeln!(out, "Existence is denied by:")?,
                    Err(e) => writeln!(out, "Error in denial of existence: {}", e)?,
                }
            } else if let Err(e) = &edge.status {
                print_tabs(out, tabs + 1, siblings)?;
                writeln!(out, "{}:", e)?;
                if extended {
                    if let Some(sig) = &edge.signature {
                        writeln!(out, "{}", sig)?;
                    }
                    writeln!(out, "For RRset:")?;
                    for member in &node.rrset {
                        writeln!(out, "{}", member)?;
                    }
                    writeln!(out, "With key:")?;
                    if let Some(key) = &self.nodes[edge.node].rr {
                        writeln!(out, "{}", key)?;
                    }
                }
            }
            self.print_node(out, edge.node, tabs + 1, extended, siblings)?;
        }
        Ok(())
    }
}

fn print_tabs<W: fmt::Write>(out: &mut W, count: usize, siblings: &[bool]) -> fmt::Result {
    for i in 0..count {
        if i + 1 == count {
            write!(out, "|---")?;
        } else if siblings.get(i).copied().unwrap_or(false) {
            write!(out, "|   ")?;
        } else {
            write!(out, "    ")?;
        }
    }
    Ok(())
}

impl fmt::Display for TrustTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f, false)
    }
}
