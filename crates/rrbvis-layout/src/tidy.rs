#![forbid(unsafe_code)]

//! Tidy tree placement (Reingold–Tilford with the Buchheim/Walker
//! linear-time refinements).
//!
//! Produces a relative horizontal coordinate per node in units of the
//! sibling spacing; the caller scales by `dx` and assigns `y` from depth.
//!
//! # Invariants
//!
//! 1. Parents are centred over their first and last child.
//! 2. Adjacent contour nodes are at least `separation(left, right)` apart.
//! 3. The root is placed at `x = 0`.
//! 4. Output is deterministic for a given input.

/// Per-node bookkeeping for the walker.
#[derive(Debug, Clone)]
struct Walker {
    parent: Option<usize>,
    children: Vec<usize>,
    /// Index among siblings.
    number: usize,
    prelim: f64,
    modifier: f64,
    change: f64,
    shift: f64,
    thread: Option<usize>,
    ancestor: usize,
    /// Default ancestor used while apportioning this node's children.
    default_ancestor: Option<usize>,
}

/// Place a forest given as parent links and ordered child lists.
///
/// `children[v]` lists `v`'s children left to right; `root` must be a node
/// with no parent. `separation(left, right)` returns the minimum distance
/// between two horizontally adjacent nodes.
pub fn place<F>(root: usize, children: &[Vec<usize>], mut separation: F) -> Vec<f64>
where
    F: FnMut(usize, usize) -> f64,
{
    let n = children.len();
    let mut w: Vec<Walker> = (0..n)
        .map(|v| Walker {
            parent: None,
            children: children[v].clone(),
            number: 0,
            prelim: 0.0,
            modifier: 0.0,
            change: 0.0,
            shift: 0.0,
            thread: None,
            ancestor: v,
            default_ancestor: None,
        })
        .collect();
    for v in 0..n {
        for (i, &c) in children[v].iter().enumerate() {
            w[c].parent = Some(v);
            w[c].number = i;
        }
    }

    // Post-order, left to right.
    let mut order = Vec::with_capacity(n);
    let mut stack = vec![(root, false)];
    while let Some((v, expanded)) = stack.pop() {
        if expanded {
            order.push(v);
        } else {
            stack.push((v, true));
            for &c in w[v].children.iter().rev() {
                stack.push((c, false));
            }
        }
    }

    for &v in &order {
        first_walk(&mut w, v, &mut separation);
    }

    let mut x = vec![0.0; n];
    let root_mod = -w[root].prelim;
    // Pre-order: (node, accumulated parent modifier).
    let mut stack = vec![(root, root_mod)];
    while let Some((v, parent_mod)) = stack.pop() {
        x[v] = w[v].prelim + parent_mod;
        let acc = w[v].modifier + parent_mod;
        for &c in w[v].children.iter().rev() {
            stack.push((c, acc));
        }
    }
    x
}

fn left_sibling(w: &[Walker], v: usize) -> Option<usize> {
    let parent = w[v].parent?;
    let number = w[v].number;
    if number == 0 {
        None
    } else {
        Some(w[parent].children[number - 1])
    }
}

fn first_sibling(w: &[Walker], v: usize) -> usize {
    w[v].parent.map_or(v, |p| w[p].children[0])
}

fn next_left(w: &[Walker], v: usize) -> Option<usize> {
    w[v].children.first().copied().or(w[v].thread)
}

fn next_right(w: &[Walker], v: usize) -> Option<usize> {
    w[v].children.last().copied().or(w[v].thread)
}

fn first_walk<F>(w: &mut [Walker], v: usize, separation: &mut F)
where
    F: FnMut(usize, usize) -> f64,
{
    let left = left_sibling(w, v);
    if let (Some(&first), Some(&last)) = (w[v].children.first(), w[v].children.last()) {
        execute_shifts(w, v);
        let midpoint = (w[first].prelim + w[last].prelim) / 2.0;
        if let Some(l) = left {
            w[v].prelim = w[l].prelim + separation(l, v);
            w[v].modifier = w[v].prelim - midpoint;
        } else {
            w[v].prelim = midpoint;
        }
    } else if let Some(l) = left {
        w[v].prelim = w[l].prelim + separation(l, v);
    }

    if let Some(parent) = w[v].parent {
        let default = w[parent]
            .default_ancestor
            .unwrap_or_else(|| first_sibling(w, v));
        let next = apportion(w, v, left, default, separation);
        w[parent].default_ancestor = Some(next);
    }
}

fn apportion<F>(
    w: &mut [Walker],
    v: usize,
    left: Option<usize>,
    mut ancestor: usize,
    separation: &mut F,
) -> usize
where
    F: FnMut(usize, usize) -> f64,
{
    let Some(left) = left else {
        return ancestor;
    };

    // Inner/outer contours of the right (p) and left (m) subtrees.
    let mut vip = v;
    let mut vop = v;
    let mut vim = left;
    let mut vom = first_sibling(w, v);
    let mut sip = w[vip].modifier;
    let mut sop = w[vop].modifier;
    let mut sim = w[vim].modifier;
    let mut som = w[vom].modifier;

    let mut next_im = next_right(w, vim);
    let mut next_ip = next_left(w, vip);
    while let (Some(im), Some(ip)) = (next_im, next_ip) {
        vim = im;
        vip = ip;
        // Both outer contours are at least as deep as the inner ones.
        vom = next_left(w, vom).unwrap_or(vom);
        vop = next_right(w, vop).unwrap_or(vop);
        w[vop].ancestor = v;

        let shift = w[vim].prelim + sim - w[vip].prelim - sip + separation(vim, vip);
        if shift > 0.0 {
            let wm = next_ancestor(w, vim, v, ancestor);
            move_subtree(w, wm, v, shift);
            sip += shift;
            sop += shift;
        }
        sim += w[vim].modifier;
        sip += w[vip].modifier;
        som += w[vom].modifier;
        sop += w[vop].modifier;

        next_im = next_right(w, vim);
        next_ip = next_left(w, vip);
    }

    if let Some(im) = next_im
        && next_right(w, vop).is_none()
    {
        w[vop].thread = Some(im);
        w[vop].modifier += sim - sop;
    }
    if let Some(ip) = next_ip
        && next_left(w, vom).is_none()
    {
        w[vom].thread = Some(ip);
        w[vom].modifier += sip - som;
        ancestor = v;
    }
    ancestor
}

fn next_ancestor(w: &[Walker], vim: usize, v: usize, default: usize) -> usize {
    let a = w[vim].ancestor;
    if w[a].parent.is_some() && w[a].parent == w[v].parent {
        a
    } else {
        default
    }
}

fn move_subtree(w: &mut [Walker], wm: usize, wp: usize, shift: f64) {
    let subtrees = w[wp].number.saturating_sub(w[wm].number).max(1) as f64;
    let change = shift / subtrees;
    w[wp].change -= change;
    w[wp].shift += shift;
    w[wm].change += change;
    w[wp].prelim += shift;
    w[wp].modifier += shift;
}

fn execute_shifts(w: &mut [Walker], v: usize) {
    let mut shift = 0.0;
    let mut change = 0.0;
    let children = w[v].children.clone();
    for &c in children.iter().rev() {
        w[c].prelim += shift;
        w[c].modifier += shift;
        change += w[c].change;
        shift += w[c].shift + change;
    }
}
