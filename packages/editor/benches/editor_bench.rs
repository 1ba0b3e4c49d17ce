use criterion::{black_box, criterion_group, criterion_main, Criterion};
use outline_editor::{
    diff_text, layout_regions, resolve, BlockSnapshot, BlockTree, Direction, PlacementConfig, Point,
    StructuralAction,
};
use std::collections::HashSet;

/// `width` roots, each with `depth` levels of single children
fn build_tree(width: usize, depth: usize) -> BlockTree {
    let roots: Vec<BlockSnapshot> = (0..width)
        .map(|i| {
            (0..depth).rev().fold(None, |child: Option<BlockSnapshot>, level| {
                let block = BlockSnapshot::new(format!("b{i}-{level}"), format!("block {i} level {level}"));
                Some(match child {
                    Some(child) => block.with_children(vec![child]),
                    None => block,
                })
            })
        })
        .flatten()
        .collect();
    BlockTree::from_snapshots(&roots).expect("generated ids are unique")
}

fn diff_short_text(c: &mut Criterion) {
    let current = "The quick brown fox jumps over the lazy dog";
    let target = "The quick red fox leaps over the very lazy dog!";

    c.bench_function("diff_short_text", |b| {
        b.iter(|| diff_text(black_box(current), black_box(target)))
    });
}

fn diff_paragraph(c: &mut Criterion) {
    let current = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(8);
    let target = current.replace("dolor", "color").replace("elit", "edit");

    c.bench_function("diff_paragraph", |b| {
        b.iter(|| diff_text(black_box(&current), black_box(&target)))
    });
}

fn resolve_drop_target(c: &mut Criterion) {
    let tree = build_tree(50, 4);
    let config = PlacementConfig::default();
    let regions = layout_regions(&tree, 32.0, config.indent_unit, 800.0);
    let forbidden = HashSet::new();

    c.bench_function("resolve_drop_target", |b| {
        b.iter(|| {
            resolve(
                &tree,
                &config,
                black_box(Point::new(10.0, 3210.0)),
                &regions,
                &forbidden,
            )
        })
    });
}

fn apply_and_invert(c: &mut Criterion) {
    let tree = build_tree(50, 4);

    c.bench_function("apply_and_invert_move", |b| {
        b.iter(|| {
            let mut tree = tree.clone();
            let applied = StructuralAction::move_block("b25-0", Direction::Down)
                .apply(&mut tree)
                .unwrap();
            applied.inverse.apply(&mut tree).unwrap();
            tree
        })
    });
}

criterion_group!(
    benches,
    diff_short_text,
    diff_paragraph,
    resolve_drop_target,
    apply_and_invert
);
criterion_main!(benches);
