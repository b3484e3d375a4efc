//! # Sincronización de relaciones bidireccionales
//!
//! Las asociaciones entre entidades se mantienen en memoria con dos índices
//! espejo, de modo que cualquier cambio hecho desde un lado se refleja
//! inmediatamente en el otro.
//!
//! - [`ManyToMany`] - Category ↔ Food, Category ↔ Menu
//! - [`OneToMany`] - Restaurant ↔ Picture, Restaurant ↔ Booking
//!
//! Las operaciones son idempotentes: enlazar dos veces el mismo par no
//! cambia el tamaño de las colecciones, y desenlazar un par inexistente no
//! hace nada.

use std::collections::{BTreeMap, BTreeSet};

/// Pares que hay que insertar y borrar en la tabla de unión
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkChanges<L, R> {
    pub linked: Vec<(L, R)>,
    pub unlinked: Vec<(L, R)>,
}

impl<L, R> LinkChanges<L, R> {
    pub fn is_empty(&self) -> bool {
        self.linked.is_empty() && self.unlinked.is_empty()
    }
}

impl<L, R> Default for LinkChanges<L, R> {
    fn default() -> Self {
        Self {
            linked: Vec::new(),
            unlinked: Vec::new(),
        }
    }
}

/// Asociación muchos-a-muchos con ambos lados indexados
///
/// `L` es el lado propietario (el que escribe las filas de unión) y `R` el
/// lado inverso.
#[derive(Debug, Clone)]
pub struct ManyToMany<L, R> {
    left: BTreeMap<L, BTreeSet<R>>,
    right: BTreeMap<R, BTreeSet<L>>,
}

impl<L, R> Default for ManyToMany<L, R> {
    fn default() -> Self {
        Self {
            left: BTreeMap::new(),
            right: BTreeMap::new(),
        }
    }
}

impl<L: Ord + Copy, R: Ord + Copy> ManyToMany<L, R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construye la asociación a partir de filas persistidas
    ///
    /// Las filas repetidas se colapsan en un único enlace.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, R)>,
    {
        let mut relation = Self::new();
        for (l, r) in pairs {
            relation.link(l, r);
        }
        relation
    }

    /// Enlaza `l` y `r` en ambos lados. Devuelve `false` si ya estaban enlazados.
    pub fn link(&mut self, l: L, r: R) -> bool {
        let inserted = self.left.entry(l).or_default().insert(r);
        if inserted {
            self.right.entry(r).or_default().insert(l);
        }
        inserted
    }

    /// Desenlaza `l` y `r` en ambos lados. Devuelve `false` si no estaban enlazados.
    pub fn unlink(&mut self, l: L, r: R) -> bool {
        let removed = match self.left.get_mut(&l) {
            Some(rights) => rights.remove(&r),
            None => false,
        };
        if !removed {
            return false;
        }

        if self.left.get(&l).is_some_and(BTreeSet::is_empty) {
            self.left.remove(&l);
        }
        if let Some(lefts) = self.right.get_mut(&r) {
            lefts.remove(&l);
            if lefts.is_empty() {
                self.right.remove(&r);
            }
        }
        true
    }

    pub fn contains(&self, l: L, r: R) -> bool {
        self.left.get(&l).is_some_and(|rights| rights.contains(&r))
    }

    /// Colección del lado propietario, en orden ascendente
    pub fn rights_of(&self, l: L) -> Vec<R> {
        self.left
            .get(&l)
            .map(|rights| rights.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Colección del lado inverso, en orden ascendente
    pub fn lefts_of(&self, r: R) -> Vec<L> {
        self.right
            .get(&r)
            .map(|lefts| lefts.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Número de enlaces (filas de unión)
    pub fn len(&self) -> usize {
        self.left.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn pairs(&self) -> Vec<(L, R)> {
        self.left
            .iter()
            .flat_map(|(l, rights)| rights.iter().map(move |r| (*l, *r)))
            .collect()
    }

    /// Sustituye por completo la colección de `l`
    pub fn replace_rights<I>(&mut self, l: L, rights: I) -> LinkChanges<L, R>
    where
        I: IntoIterator<Item = R>,
    {
        let wanted: BTreeSet<R> = rights.into_iter().collect();
        let current: BTreeSet<R> = self.rights_of(l).into_iter().collect();
        let mut changes = LinkChanges::default();

        for r in current.difference(&wanted) {
            self.unlink(l, *r);
            changes.unlinked.push((l, *r));
        }
        for r in wanted.difference(&current) {
            self.link(l, *r);
            changes.linked.push((l, *r));
        }
        changes
    }

    /// Sustituye por completo la colección de `r` (desde el lado inverso)
    pub fn replace_lefts<I>(&mut self, r: R, lefts: I) -> LinkChanges<L, R>
    where
        I: IntoIterator<Item = L>,
    {
        let wanted: BTreeSet<L> = lefts.into_iter().collect();
        let current: BTreeSet<L> = self.lefts_of(r).into_iter().collect();
        let mut changes = LinkChanges::default();

        for l in current.difference(&wanted) {
            self.unlink(*l, r);
            changes.unlinked.push((*l, r));
        }
        for l in wanted.difference(&current) {
            self.link(*l, r);
            changes.linked.push((*l, r));
        }
        changes
    }
}

/// Asociación uno-a-muchos: cada hijo pertenece como mucho a un padre
#[derive(Debug, Clone)]
pub struct OneToMany<P, C> {
    children: BTreeMap<P, BTreeSet<C>>,
    parent: BTreeMap<C, P>,
}

impl<P, C> Default for OneToMany<P, C> {
    fn default() -> Self {
        Self {
            children: BTreeMap::new(),
            parent: BTreeMap::new(),
        }
    }
}

impl<P: Ord + Copy, C: Ord + Copy> OneToMany<P, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asigna `c` a `p`, sacándolo de la colección de su padre anterior
    pub fn attach(&mut self, p: P, c: C) {
        if let Some(previous) = self.parent.insert(c, p) {
            if previous == p {
                return;
            }
            self.forget_child(previous, c);
        }
        self.children.entry(p).or_default().insert(c);
    }

    /// Quita `c` de `p` y limpia su referencia al padre
    ///
    /// No hace nada si `c` pertenece a otro padre.
    pub fn detach(&mut self, p: P, c: C) -> bool {
        if self.parent.get(&c) != Some(&p) {
            return false;
        }
        self.parent.remove(&c);
        self.forget_child(p, c);
        true
    }

    pub fn parent_of(&self, c: C) -> Option<P> {
        self.parent.get(&c).copied()
    }

    pub fn children_of(&self, p: P) -> Vec<C> {
        self.children
            .get(&p)
            .map(|children| children.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Elimina el padre y devuelve los hijos que quedan huérfanos
    pub fn remove_parent(&mut self, p: P) -> Vec<C> {
        let orphans: Vec<C> = self
            .children
            .remove(&p)
            .map(|children| children.into_iter().collect())
            .unwrap_or_default();
        for c in &orphans {
            self.parent.remove(c);
        }
        orphans
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    fn forget_child(&mut self, p: P, c: C) {
        if let Some(children) = self.children.get_mut(&p) {
            children.remove(&c);
            if children.is_empty() {
                self.children.remove(&p);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_is_visible_from_both_sides() {
        let mut category_food = ManyToMany::<i64, i64>::new();

        assert!(category_food.link(1, 10));
        assert_eq!(category_food.rights_of(1), vec![10]);
        assert_eq!(category_food.lefts_of(10), vec![1]);
        assert!(category_food.contains(1, 10));
    }

    #[test]
    fn relinking_keeps_collection_size() {
        let mut category_menu = ManyToMany::<i64, i64>::new();
        category_menu.link(3, 7);

        assert!(!category_menu.link(3, 7));
        assert_eq!(category_menu.len(), 1);
        assert_eq!(category_menu.rights_of(3).len(), 1);
        assert_eq!(category_menu.lefts_of(7).len(), 1);
    }

    #[test]
    fn unlink_clears_both_sides() {
        let mut category_food = ManyToMany::<i64, i64>::new();
        category_food.link(1, 10);
        category_food.link(2, 10);

        assert!(category_food.unlink(1, 10));
        assert!(!category_food.contains(1, 10));
        assert!(category_food.rights_of(1).is_empty());
        assert_eq!(category_food.lefts_of(10), vec![2]);

        assert!(!category_food.unlink(1, 10));
        assert_eq!(category_food.len(), 1);
    }

    #[test]
    fn from_pairs_collapses_duplicate_rows() {
        let relation = ManyToMany::from_pairs([(1, 2), (1, 2), (1, 3), (4, 2)]);

        assert_eq!(relation.len(), 3);
        assert_eq!(relation.pairs(), vec![(1, 2), (1, 3), (4, 2)]);
    }

    #[test]
    fn replace_rights_reports_the_join_row_changes() {
        let mut relation = ManyToMany::from_pairs([(1, 10), (1, 11), (2, 11)]);

        let changes = relation.replace_rights(1, [11, 12, 12]);

        assert_eq!(changes.unlinked, vec![(1, 10)]);
        assert_eq!(changes.linked, vec![(1, 12)]);
        assert_eq!(relation.rights_of(1), vec![11, 12]);
        assert!(relation.lefts_of(10).is_empty());
        assert_eq!(relation.lefts_of(11), vec![1, 2]);
    }

    #[test]
    fn replace_lefts_from_inverse_side() {
        let mut relation = ManyToMany::from_pairs([(1, 10), (2, 10)]);

        let changes = relation.replace_lefts(10, [2, 3]);

        assert_eq!(changes.unlinked, vec![(1, 10)]);
        assert_eq!(changes.linked, vec![(3, 10)]);
        assert_eq!(relation.lefts_of(10), vec![2, 3]);
        assert_eq!(relation.rights_of(3), vec![10]);
    }

    #[test]
    fn replacing_with_same_set_is_a_no_op() {
        let mut relation = ManyToMany::from_pairs([(1, 10), (1, 11)]);

        let changes = relation.replace_rights(1, [11, 10]);

        assert!(changes.is_empty());
        assert_eq!(relation.len(), 2);
    }

    #[test]
    fn attach_sets_the_owning_side() {
        let mut pictures = OneToMany::<i64, i64>::new();

        pictures.attach(1, 100);

        assert_eq!(pictures.children_of(1), vec![100]);
        assert_eq!(pictures.parent_of(100), Some(1));
    }

    #[test]
    fn attach_moves_child_between_parents() {
        let mut bookings = OneToMany::<i64, i64>::new();
        bookings.attach(1, 100);
        bookings.attach(1, 100);
        assert_eq!(bookings.len(), 1);

        bookings.attach(2, 100);

        assert!(bookings.children_of(1).is_empty());
        assert_eq!(bookings.children_of(2), vec![100]);
        assert_eq!(bookings.parent_of(100), Some(2));
    }

    #[test]
    fn detach_clears_parent_reference() {
        let mut pictures = OneToMany::<i64, i64>::new();
        pictures.attach(1, 100);

        assert!(!pictures.detach(2, 100));
        assert_eq!(pictures.parent_of(100), Some(1));

        assert!(pictures.detach(1, 100));
        assert!(pictures.children_of(1).is_empty());
        assert_eq!(pictures.parent_of(100), None);
    }

    #[test]
    fn removing_parent_orphans_children() {
        let mut bookings = OneToMany::<i64, i64>::new();
        bookings.attach(1, 100);
        bookings.attach(1, 101);
        bookings.attach(2, 102);

        let orphans = bookings.remove_parent(1);

        assert_eq!(orphans, vec![100, 101]);
        assert_eq!(bookings.parent_of(100), None);
        assert_eq!(bookings.len(), 1);
    }
}
