//! Pre-built report fixtures and mock scenarios.
//!
//! The reports follow the layout printed by `vmmap <pid>`: a process header,
//! one section per region class, a legend and a summary table.

use super::capture::{MockCapture, MockStep};

/// Full report with ten region lines and every kind of surrounding noise.
pub const TYPICAL_REPORT: &str = "\
Process:         app [4242]
Path:            /bin/app
Load Address:    0x100484000
Identifier:      app
Version:         ???
Code Type:       ARM64
Platform:        macOS
Parent Process:  zsh [1017]

Date/Time:       2026-10-16 09:12:44.181 +0000
Launch Time:     2026-10-16 09:12:40.002 +0000
OS Version:      macOS 14.5 (23F79)
Report Version:  7
Analysis Tool:   /usr/bin/vmmap

Physical footprint:         9360K
Physical footprint (peak):  9376K
Idle exit:                  untracked
----

Virtual Memory Map of process 4242 (app)
Output report format:  2.4  -- 64-bit process
VM page size:  16384 bytes

==== Non-writable regions for process 4242
REGION TYPE                    START - END         [ VSIZE  RSDNT  DIRTY   SWAP] PRT/MAX SHRMOD PURGE    REGION DETAIL
__TEXT                      100484000-100f3c000    [ 10.7M  7904K     0K     0K] r-x/r-x SM=COW          /bin/app
__LINKEDIT                  1010d4000-101344000    [ 2496K  1088K     0K     0K] r--/r-- SM=COW          /bin/app
MALLOC guard page           100000000-100004000    [   16K     0K     0K     0K] ---/rwx SM=ZER
STACK GUARD                 16b5a8000-16eda8000    [ 56.0M     0K     0K     0K] ---/rwx SM=NUL          stack guard for thread 0
shared memory               102000000-102004000    [   16K    16K    16K     0K] r--/r-- SM=SHM

==== Writable regions for process 4242
REGION TYPE                    START - END         [ VSIZE  RSDNT  DIRTY   SWAP] PRT/MAX SHRMOD PURGE    REGION DETAIL
__DATA                      100f3c000-100f50000    [   80K    80K    48K     0K] rw-/rw- SM=COW          /bin/app
MALLOC_TINY                 600000000-600100000    [ 1024K   208K   208K     0K] rw-/rwx SM=PRV          DefaultMallocZone_0x100f60000
MALLOC_SMALL                608000000-610000000    [  128M  1632K  1632K   256K] rw-/rwx SM=PRV          DefaultMallocZone_0x100f60000
VM_ALLOCATE (reserved)      610000000-610400000    [ 4096K     0K     0K     0K] rw-/rwx SM=NUL          reserved VM address space (unallocated)
Stack                       16eda8000-16f5a4000    [ 8176K    80K    80K     0K] rw-/rwx SM=PRV          thread 0

==== Legend
SM=sharing mode:
\tCOW=copy_on_write PRV=private NUL=empty ALI=aliased
\tSHM=shared ZER=zero_filled S/A=shared_alias
PURGE=purgeable mode:
\tV=volatile N=nonvolatile E=empty   otherwise is unpurgeable

==== Summary for process 4242
ReadOnly portion of Libraries: Total=12.2M resident=8992K(72%) swapped_out_or_unallocated=3488K(28%)
Writable regions: Total=141.4M written=1968K(1%) resident=2000K(1%) swapped_out=256K(0%) unallocated=139.5M(99%)

                                VIRTUAL RESIDENT    DIRTY  SWAPPED VOLATILE   NONVOL    EMPTY   REGION
REGION TYPE                        SIZE     SIZE     SIZE     SIZE     SIZE     SIZE     SIZE    COUNT (non-coalesced)
===========                     ======= ========    =====  ======= ========   ======    =====  =======
MALLOC_SMALL                       128M    1632K    1632K     256K       0K       0K       0K        1
__TEXT                            10.7M    7904K       0K       0K       0K       0K       0K        1
TOTAL                            212.6M    19.0M    2000K     256K       0K       0K       0K       10
";

/// The same process after its small-malloc zone grew by 64 MiB and a new
/// mapped file appeared. Every other region is unchanged.
pub const GROWN_REPORT: &str = "\
==== Non-writable regions for process 4242
REGION TYPE                    START - END         [ VSIZE  RSDNT  DIRTY   SWAP] PRT/MAX SHRMOD PURGE    REGION DETAIL
__TEXT                      100484000-100f3c000    [ 10.7M  7904K     0K     0K] r-x/r-x SM=COW          /bin/app
__LINKEDIT                  1010d4000-101344000    [ 2496K  1088K     0K     0K] r--/r-- SM=COW          /bin/app
MALLOC guard page           100000000-100004000    [   16K     0K     0K     0K] ---/rwx SM=ZER
STACK GUARD                 16b5a8000-16eda8000    [ 56.0M     0K     0K     0K] ---/rwx SM=NUL          stack guard for thread 0
shared memory               102000000-102004000    [   16K    16K    16K     0K] r--/r-- SM=SHM
mapped file                 103000000-103800000    [ 8192K  1024K     0K     0K] r--/r-- SM=ALI          /var/db/app/cache.db

==== Writable regions for process 4242
REGION TYPE                    START - END         [ VSIZE  RSDNT  DIRTY   SWAP] PRT/MAX SHRMOD PURGE    REGION DETAIL
__DATA                      100f3c000-100f50000    [   80K    80K    48K     0K] rw-/rw- SM=COW          /bin/app
MALLOC_TINY                 600000000-600100000    [ 1024K   240K   240K     0K] rw-/rwx SM=PRV          DefaultMallocZone_0x100f60000
MALLOC_SMALL                608000000-614000000    [  192M  9.5M   9.5M   256K] rw-/rwx SM=PRV          DefaultMallocZone_0x100f60000
VM_ALLOCATE (reserved)      614000000-614400000    [ 4096K     0K     0K     0K] rw-/rwx SM=NUL          reserved VM address space (unallocated)
Stack                       16eda8000-16f5a4000    [ 8176K    96K    96K     0K] rw-/rwx SM=PRV          thread 0

==== Legend
SM=sharing mode:
\tCOW=copy_on_write PRV=private NUL=empty ALI=aliased
";

/// Three decodable region lines interleaved with noise and malformed lines.
pub const NOISY_REPORT: &str = "\
Process:         app [4242]

==== Non-writable regions for process 4242
REGION TYPE                    START - END         [ VSIZE  RSDNT  DIRTY   SWAP] PRT/MAX SHRMOD PURGE    REGION DETAIL
__TEXT                      100484000-100f3c000    [ 10.7M  7904K     0K     0K] r-x/r-x SM=COW          /bin/app
__LINKEDIT                  1010d4000-101344000    [ 2496K  1088K     0K] r--/r-- SM=COW          /bin/app
--------------------------------------------------------------------------------
garbage line with no structure at all
__DATA                      100f3c000-100f3c000    [   80K    80K    48K     0K] rw-/rw- SM=COW          /bin/app

==== Writable regions for process 4242
MALLOC_TINY                 600000000-600100000    [ 1024K   208K   208K     0K] rw-/rwx SM=PRV          DefaultMallocZone_0x100f60000
MALLOC_SMALL                608000000-610000000    [  128m  1632K  1632K   256K] rw-/rwx SM=PRV          DefaultMallocZone_0x100f60000
MALLOC_LARGE                620000000-630000000    [ 256.25M 0K 0K 0K] rw-/rwx SM=PRV
MALLOC_MEDIUM               640000000-650000000    256M 0K 0K 0K rw-/rwx SM=PRV
Stack                       16eda8000-16f5a4000    [ 8176K    80K    80K     0K] rw-/rwx SM=PRV          thread 0
   \t
===========
TOTAL                            212.6M    19.0M    2000K     256K       0K       0K       0K       10
";

impl MockCapture {
    /// A process whose layout never changes.
    pub fn typical_process() -> Self {
        Self::repeating(MockStep::Report(TYPICAL_REPORT.to_string()))
    }

    /// Alternates between the typical and the grown layout, starting with the
    /// typical one.
    pub fn growing_heap(cycles: usize) -> Self {
        let steps = (0..cycles).map(|i| {
            if i % 2 == 0 {
                MockStep::Report(TYPICAL_REPORT.to_string())
            } else {
                MockStep::Report(GROWN_REPORT.to_string())
            }
        });
        Self::scripted(steps, MockStep::Report(TYPICAL_REPORT.to_string()))
    }

    /// Every `nth` capture (1-based) exits with status 1; the others return
    /// the typical report.
    pub fn failing_every(nth: usize, cycles: usize) -> Self {
        let steps = (1..=cycles).map(|i| {
            if nth > 0 && i % nth == 0 {
                MockStep::Exit(1)
            } else {
                MockStep::Report(TYPICAL_REPORT.to_string())
            }
        });
        Self::scripted(steps, MockStep::Report(TYPICAL_REPORT.to_string()))
    }

    /// A target that has already exited: every capture fails.
    pub fn vanished_process() -> Self {
        Self::repeating(MockStep::Exit(1))
    }
}
