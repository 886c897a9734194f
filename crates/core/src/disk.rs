use std::path::Path;

use sysinfo::Disks;

/// Free space on the volume holding `path`, matched by the longest
/// mount-point prefix. `None` when no mounted disk contains the path.
pub fn free_space_for(path: &Path) -> Option<u64> {
    let disks = Disks::new_with_refreshed_list();
    let mut best: Option<(u64, usize)> = None;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if !path.starts_with(mount) {
            continue;
        }
        let score = mount.as_os_str().len();
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((disk.available_space(), score)),
        }
    }
    best.map(|(free, _)| free)
}
