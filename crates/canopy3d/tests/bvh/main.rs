mod large_trees;
mod ray_cast;
mod rebuild_policy;
