//! DofMapBuilder: picks a map kind per set of basis/region requirements
//! and drives assignment, offset resolution, and remote resolution.

use std::sync::Arc;

use crate::basis::BasisDofTopology;
use crate::comm::{CommTag, Communicator};
use crate::constraint::{HangingNodeConstraintMap, MatrixStore};
use crate::dof_error::DofSieveError;
use crate::filter::{CellFilter, FilterRelations};
use crate::map::inhomogeneous::InhomogeneousNodalDofMap;
use crate::map::nodal::NodalDofMap;
use crate::map::partial_element::PartialElementDofMap;
use crate::map::{DofMap, FuncSet, MapKind};
use crate::mesh::MeshTopology;

/// One requirement: these functions, with this basis, on this region.
#[derive(Clone)]
pub struct FuncRegion {
    /// Function IDs active on the region.
    pub funcs: FuncSet,
    /// Cells carrying them.
    pub region: CellFilter,
    /// Basis attached to them.
    pub basis: Arc<dyn BasisDofTopology>,
}

impl FuncRegion {
    /// Bundle a requirement.
    pub fn new(funcs: FuncSet, region: CellFilter, basis: Arc<dyn BasisDofTopology>) -> Self {
        Self {
            funcs,
            region,
            basis,
        }
    }
}

/// Builds DOF maps for one mesh/communicator pair.
///
/// Owns the cell-filter relation cache for the duration of the build, so
/// repeated set-algebra questions against the same mesh are answered once.
pub struct DofMapBuilder<'a, M, C> {
    mesh: &'a M,
    comm: &'a C,
    relations: FilterRelations,
    base_tag: CommTag,
}

/// Tags consumed per map: one for the offset scan, four for the two-phase
/// remote resolution; stride leaves headroom between maps.
const TAGS_PER_MAP: u16 = 8;

impl<'a, M: MeshTopology, C: Communicator> DofMapBuilder<'a, M, C> {
    /// A builder with the default tag namespace.
    pub fn new(mesh: &'a M, comm: &'a C) -> Self {
        Self::with_base_tag(mesh, comm, CommTag(0x4D00))
    }

    /// A builder whose collectives use tags starting at `base_tag`;
    /// concurrent builds must use disjoint namespaces.
    pub fn with_base_tag(mesh: &'a M, comm: &'a C, base_tag: CommTag) -> Self {
        Self {
            mesh,
            comm,
            relations: FilterRelations::new(),
            base_tag,
        }
    }

    /// The relation cache, for callers that want to reuse its facts.
    pub fn relations(&mut self) -> &mut FilterRelations {
        &mut self.relations
    }

    fn has_nodal_basis(regions: &[FuncRegion]) -> bool {
        regions.iter().all(|r| r.basis.is_nodal())
    }

    fn has_common_maximal_domain(&mut self, regions: &[FuncRegion]) -> bool {
        let mesh: &dyn MeshTopology = self.mesh;
        let maximal = CellFilter::maximal(mesh.spatial_dim());
        regions.iter().all(|r| {
            r.region.is_maximal() || self.relations.are_equivalent(&r.region, &maximal, mesh)
        })
    }

    /// Partition the candidate regions into disjoint pieces, merging the
    /// function sets of overlapping inputs, so each cell lands in exactly
    /// one function-subset bucket.
    fn disjoint_pieces(
        &mut self,
        regions: &[FuncRegion],
    ) -> Result<Vec<(CellFilter, FuncSet)>, DofSieveError> {
        let mesh: &dyn MeshTopology = self.mesh;
        let mut pieces: Vec<(CellFilter, FuncSet)> = Vec::new();
        for r in regions {
            let mut remainder = r.region.clone();
            let mut next: Vec<(CellFilter, FuncSet)> = Vec::new();
            for (piece, piece_funcs) in std::mem::take(&mut pieces) {
                if self.relations.is_empty(&remainder, mesh)
                    || self.relations.are_disjoint(&piece, &remainder, mesh)
                {
                    next.push((piece, piece_funcs));
                    continue;
                }
                let common = piece.intersection(&remainder)?;
                let rest = piece.difference(&remainder)?;
                let mut merged = piece_funcs.clone();
                merged.extend(r.funcs.iter().copied());
                if !self.relations.is_empty(&common, mesh) {
                    next.push((common, merged));
                }
                if !self.relations.is_empty(&rest, mesh) {
                    next.push((rest, piece_funcs));
                }
                remainder = remainder.difference(&piece)?;
            }
            if !self.relations.is_empty(&remainder, mesh) {
                next.push((remainder, r.funcs.clone()));
            }
            pieces = next;
        }
        Ok(pieces)
    }

    fn hanging_constraints(
        &mut self,
        basis: &dyn BasisDofTopology,
        store: &mut MatrixStore,
    ) -> Result<Option<HangingNodeConstraintMap>, DofSieveError> {
        if !self.mesh.has_hanging_nodes() {
            return Ok(None);
        }
        let mesh: &dyn MeshTopology = self.mesh;
        let max_cells = CellFilter::maximal(mesh.spatial_dim()).cells(mesh);
        let constraints = HangingNodeConstraintMap::build(self.mesh, basis, &max_cells, store)?;
        Ok(Some(constraints))
    }

    /// Decide a map layout for the requirements and build it.
    ///
    /// - all bases nodal, all regions the maximal-cell domain: one shared
    ///   [`NodalDofMap`] (cheapest case);
    /// - all bases nodal, heterogeneous regions: one
    ///   [`InhomogeneousNodalDofMap`] over disjoint region pieces;
    /// - element-attached or mixed bases: one [`PartialElementDofMap`] per
    ///   region, independently numbered.
    ///
    /// On meshes reporting hanging nodes, nodal maps get a
    /// [`HangingNodeConstraintMap`] attached, deduplicating interpolation
    /// matrices through `store`. Element-attached DOFs impose no inter-cell
    /// continuity, so partial-element maps carry no constraints.
    pub fn build(
        &mut self,
        regions: &[FuncRegion],
        store: &mut MatrixStore,
    ) -> Result<Vec<DofMap>, DofSieveError> {
        if regions.is_empty() {
            return Err(DofSieveError::EmptyBasis);
        }

        if Self::has_nodal_basis(regions) {
            let basis = Arc::clone(&regions[0].basis);
            let constraints = self.hanging_constraints(basis.as_ref(), store)?;

            if self.has_common_maximal_domain(regions) {
                log::debug!("building one shared nodal map");
                let mut funcs = FuncSet::new();
                for r in regions {
                    funcs.extend(r.funcs.iter().copied());
                }
                let max_cells = regions
                    .iter()
                    .find(|r| r.region.is_maximal())
                    .map(|r| r.region.clone())
                    .unwrap_or_else(|| CellFilter::maximal(self.mesh.spatial_dim()));
                let map =
                    NodalDofMap::new(self.mesh, &funcs, &max_cells, self.comm, self.base_tag)?;
                return Ok(vec![DofMap::new(MapKind::Nodal(map), constraints)]);
            }

            log::debug!("building an inhomogeneous nodal map over disjoint region pieces");
            let pieces = self.disjoint_pieces(regions)?;
            let map = InhomogeneousNodalDofMap::new(self.mesh, &pieces, self.comm, self.base_tag)?;
            return Ok(vec![DofMap::new(
                MapKind::InhomogeneousNodal(map),
                constraints,
            )]);
        }

        log::debug!("building {} partial-element maps", regions.len());
        let dim = self.mesh.spatial_dim();
        let mut maps = Vec::with_capacity(regions.len());
        for (k, r) in regions.iter().enumerate() {
            let tag = self.base_tag.offset(TAGS_PER_MAP * k as u16);
            let map = PartialElementDofMap::new(
                self.mesh,
                &r.funcs,
                r.basis.total_dofs_per_cell(dim),
                &r.region,
                self.comm,
                tag,
            )?;
            maps.push(DofMap::new(MapKind::PartialElement(map), None));
        }
        Ok(maps)
    }
}
