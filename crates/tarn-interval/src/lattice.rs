/// Partial order with binary least-upper and greatest-lower bounds.
pub trait Lattice {
    fn join(&self, other: &Self) -> Self;
    fn meet(&self, other: &Self) -> Self;
    fn is_subseteq(&self, other: &Self) -> bool;
}

pub trait HasBottom: Lattice {
    fn bottom() -> Self;
}

pub trait HasTop: Lattice {
    fn top() -> Self;
}

/// Lattice with widening and narrowing, suitable for fixpoint iteration
/// over domains with infinite ascending chains.
///
/// ## Algebraic contracts
///
/// **Widening**: `x ⊑ widen(x, y)` and `y ⊑ widen(x, y)`. The ascending
/// chain `x₀, widen(x₀, x₁), widen(widen(x₀, x₁), x₂), ...` must stabilize
/// in finitely many steps.
///
/// **Narrowing**: `x ⊓ y ⊑ narrow(x, y) ⊑ x`. The descending chain must
/// also stabilize in finitely many steps.
pub trait AbstractDomain: HasBottom + HasTop {
    /// Widen `self` with `next` to guarantee ascending chain termination.
    fn widen(&self, next: &Self) -> Self;

    /// Narrow `self` with `next` to refine a post-fixpoint downward.
    fn narrow(&self, next: &Self) -> Self;
}
